use crate::vlc::Codeword;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    /// Represents a plane or block with a zero dimension
    #[error("Invalid dimensions: plane {0}x{1} with blocks of {2}x{3}")]
    InvalidDimensions(usize, usize, usize, usize),

    /// Represents a pixel buffer whose shape disagrees with the declared plane size
    #[error("Buffer of {got_width}x{got_height} samples does not match the plane size {width}x{height}")]
    BufferShapeMismatch {
        width: usize,
        height: usize,
        got_width: usize,
        got_height: usize,
    },

    /// Represents an empty or inverted valid sample range
    #[error("Invalid sample range: min {min} is above max {max}")]
    InvalidSampleRange { min: i16, max: i16 },

    /// Represents a quantizer whose vector size is not the block area
    #[error("Quantizer dimension {quantizer} does not match the block area {block}")]
    QuantizerDimensionMismatch { quantizer: usize, block: usize },

    /// Represents a codebook without any code vectors, or with vectors of mixed size
    #[error("Invalid codebook: {0}")]
    InvalidCodebook(String),

    /// Represents a prefix code table that cannot be turned into canonical codes
    #[error("Invalid code table: {0}")]
    InvalidCodeTable(String),

    /// Represents frame markers the attached run-length coder does not carry
    #[error("Marker mismatch: {marker} is configured as {configured:?}, the run-length coder uses {coder:?}")]
    MarkerMismatch {
        marker: &'static str,
        configured: Codeword,
        coder: Option<Codeword>,
    },

    /// Represents a coding call made before a required collaborator was attached
    #[error("API Error: no {0} attached")]
    MissingCollaborator(&'static str),

    /// Represents a frame whose byte length does not match the declared geometry
    #[error("Frame size mismatch: expected {expected} bytes, got {got}")]
    FrameSizeMismatch { expected: usize, got: usize },

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
