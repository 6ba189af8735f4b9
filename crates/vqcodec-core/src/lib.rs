//! Rate-Budgeted Vector Quantization Plane Codec
//!
//! This crate codes the residual between a source plane set (luminance and
//! two chroma planes) and a reference plane set, typically the motion
//! compensated previous frame, into a self-delimiting bit stream that never
//! exceeds a given bit budget.
//!
//! # Layer Responsibilities
//!
//! - [`grid`] splits every plane into blocks and keeps per-block statistics
//! - [`encoder`] selects the blocks worth coding, writes them and applies
//!   them to the reference (closed loop)
//! - [`decoder`] reads the stream back and applies it to its own reference
//! - [`vlc`], [`quantizer`] and [`bitstream`] are the collaborators the coders
//!   are built on; all of them are reached through traits
//!
//! Containers, colour conversion and motion compensation are left to outer
//! layers.
//!
//! # Example
//!
//! ```rust
//! use bitstream_io::{BigEndian, BitReader, BitWriter};
//! use std::io::Cursor;
//! use vqcodec_core::{
//!     finish_stream, Chroma, CodebookQuantizer, CodecOptions, CodingStatus, PlaneDecoder,
//!     PlaneEncoder, PlaneSet, VlcTable,
//! };
//!
//! let options = CodecOptions::default();
//! let quantizer = CodebookQuantizer::flat_levels(16, 4, 64)?;
//! let runs = VlcTable::run_length()?;
//! let indices = VlcTable::index()?;
//!
//! let mut source = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
//! for y in 0..4 {
//!     for x in 0..4 {
//!         source.plane_mut(0)[[y, x]] = 160;
//!     }
//! }
//!
//! // encode against a flat reference
//! let mut reference = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
//! let mut writer = BitWriter::endian(Vec::new(), BigEndian);
//! let (mut run_coder, mut index_coder) = (runs.encoder(), indices.encoder());
//! let report = {
//!     let grids = PlaneSet::encoding_grids(&source, &mut reference, 4, 4)?;
//!     let mut encoder = PlaneEncoder::new(grids, &options)?;
//!     encoder
//!         .attach_quantizer(&quantizer)
//!         .attach_run_coder(&mut run_coder)
//!         .attach_index_coder(&mut index_coder)
//!         .attach_writer(&mut writer);
//!     encoder.encode(1024)?
//! };
//! assert_eq!(report.status, CodingStatus::Complete);
//! let bytes = finish_stream(writer)?;
//!
//! // the decoder ends up with the encoder's reference
//! let mut decoded = PlaneSet::blank(16, 16, Chroma::Yuv420, 128);
//! let mut reader = BitReader::endian(Cursor::new(bytes), BigEndian);
//! let (mut run_decoder, mut index_decoder) = (runs.decoder(), indices.decoder());
//! {
//!     let grids = decoded.decoding_grids(4, 4, options.sample_range)?;
//!     let mut decoder = PlaneDecoder::new(grids, &options)?;
//!     decoder
//!         .attach_quantizer(&quantizer)
//!         .attach_run_decoder(&mut run_decoder)
//!         .attach_index_decoder(&mut index_decoder)
//!         .attach_reader(&mut reader);
//!     decoder.decode(1024)?;
//! }
//! assert_eq!(decoded, reference);
//! assert_eq!(reference.plane(0)[[0, 0]], 160);
//! # Ok::<(), vqcodec_core::CodecError>(())
//! ```

pub mod bitstream;
pub mod decoder;
pub mod encoder;
mod error;
pub mod grid;
pub mod options;
pub mod plane;
pub mod quantizer;
mod result;
pub mod vlc;

pub use bitstream::{finish_stream, BitStreamReader, BitStreamWriter};
pub use decoder::{DecoderStrategy, PlaneDecoder};
pub use encoder::{CodingReport, CodingStatus, EncoderStrategy, PlaneEncoder};
pub use error::CodecError;
pub use grid::{BlockLayout, DecodingGrid, EncodingGrid};
pub use options::{CodecOptions, FrameMarkers, QualityLevel, SampleRange, StrategyKind};
pub use plane::{Chroma, PlaneSet, SampleDepth};
pub use quantizer::{CodebookQuantizer, MultiCodebookQuantizer, VectorQuantizer};
pub use result::Result;
pub use vlc::{Codeword, EscapeCode, SymbolDecoder, SymbolEncoder, VlcTable};
