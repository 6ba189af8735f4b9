//! Plane set encoder.
//!
//! A [`PlaneEncoder`] owns the three channel grids (luminance, chroma U,
//! chroma V) and borrows the collaborators attached to it. Each call to
//! [`PlaneEncoder::encode`] selects blocks with the configured strategy,
//! writes them to the bit stream and applies them to the reference planes.

mod emission;
mod histogram;
mod intra;
mod quality;
mod selection;
mod standard;
mod strategy;

pub use histogram::{energy_thresholds, DeferredHistogram, FastHistogram};
pub use intra::IntraPrediction;
pub(crate) use intra::unzigzag;
pub use quality::ConstantQuality;
pub use standard::Standard;
pub use strategy::{EncoderStrategy, EncodingStrategy};

use crate::bitstream::BitStreamWriter;
use crate::error::CodecError;
use crate::grid::EncodingGrid;
use crate::options::{CodecOptions, FrameMarkers, SampleRange};
use crate::quantizer::VectorQuantizer;
use crate::result::Result;
use crate::vlc::{EscapeCode, SymbolEncoder};

/// How a coding call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CodingStatus {
    /// Every block was processed.
    Complete = 0,
    /// The bit budget ran out first.
    BudgetReached = 1,
    /// A symbol could not be coded or the stream is corrupt. Discard the frame.
    Desync = 2,
}

impl From<CodingStatus> for u8 {
    fn from(status: CodingStatus) -> Self {
        status as u8
    }
}

/// Result of one encode or decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingReport {
    pub status: CodingStatus,
    /// Bits written to, or read from, the stream.
    pub bits_used: u64,
    /// Blocks carried by the stream, per channel.
    pub coded_blocks: [usize; 3],
}

impl CodingReport {
    pub(crate) fn new(status: CodingStatus, bits_used: u64, coded_blocks: [usize; 3]) -> Self {
        Self {
            status,
            bits_used,
            coded_blocks,
        }
    }

    pub fn total_coded(&self) -> usize {
        self.coded_blocks.iter().sum()
    }
}

pub struct PlaneEncoder<'a> {
    grids: [EncodingGrid<'a>; 3],
    strategy: EncoderStrategy,
    range: SampleRange,
    markers: FrameMarkers,
    quantizer: Option<&'a dyn VectorQuantizer>,
    run_coder: Option<&'a mut dyn SymbolEncoder>,
    index_coder: Option<&'a mut dyn SymbolEncoder>,
    intra_coder: Option<&'a mut dyn SymbolEncoder>,
    writer: Option<&'a mut dyn BitStreamWriter>,
}

impl<'a> PlaneEncoder<'a> {
    /// Binds the three channel grids. All grids must use the block size of `options`.
    pub fn new(grids: [EncodingGrid<'a>; 3], options: &CodecOptions) -> Result<Self> {
        for grid in &grids {
            let layout = grid.layout();
            if layout.block_width() != options.block_width
                || layout.block_height() != options.block_height
            {
                return Err(CodecError::InvalidDimensions(
                    layout.plane_width(),
                    layout.plane_height(),
                    options.block_width,
                    options.block_height,
                ));
            }
        }

        Ok(Self {
            grids,
            strategy: options.encoder_strategy(),
            range: options.sample_range,
            markers: options.markers,
            quantizer: None,
            run_coder: None,
            index_coder: None,
            intra_coder: None,
            writer: None,
        })
    }

    pub fn attach_quantizer(&mut self, quantizer: &'a dyn VectorQuantizer) -> &mut Self {
        self.quantizer = Some(quantizer);
        self
    }

    pub fn attach_run_coder(&mut self, coder: &'a mut dyn SymbolEncoder) -> &mut Self {
        self.run_coder = Some(coder);
        self
    }

    pub fn attach_index_coder(&mut self, coder: &'a mut dyn SymbolEncoder) -> &mut Self {
        self.index_coder = Some(coder);
        self
    }

    pub fn attach_intra_coder(&mut self, coder: &'a mut dyn SymbolEncoder) -> &mut Self {
        self.intra_coder = Some(coder);
        self
    }

    pub fn attach_writer(&mut self, writer: &'a mut dyn BitStreamWriter) -> &mut Self {
        self.writer = Some(writer);
        self
    }

    pub fn strategy(&self) -> EncoderStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: EncoderStrategy) {
        self.strategy = strategy;
    }

    pub fn grids(&self) -> &[EncodingGrid<'a>; 3] {
        &self.grids
    }

    /// Blocks selected for the stream in the last call to `encode`, per channel.
    pub fn coded_blocks(&self) -> [usize; 3] {
        [
            self.grids[0].coded_count(),
            self.grids[1].coded_count(),
            self.grids[2].coded_count(),
        ]
    }

    /// Codes the plane set in at most `bit_budget` bits.
    ///
    /// Fails only when a collaborator the strategy needs is missing or does
    /// not fit the block size. Budget exhaustion and coding failures are
    /// reported through [`CodingReport::status`].
    pub fn encode(&mut self, bit_budget: u64) -> Result<CodingReport> {
        let strategy = self.strategy;
        let report = strategy.encode(self, bit_budget)?;
        log::debug!(
            "encoded {:?} blocks in {} of {} bits, status {:?}",
            report.coded_blocks,
            report.bits_used,
            bit_budget,
            report.status
        );
        Ok(report)
    }

    pub(crate) fn vector_session(&mut self) -> Result<VectorSession<'_, 'a>> {
        let quantizer = self
            .quantizer
            .ok_or(CodecError::MissingCollaborator("vector quantizer"))?;
        let run_coder = self
            .run_coder
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("run-length coder"))?;
        let index_coder = self
            .index_coder
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("index coder"))?;
        let writer = self
            .writer
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("bit writer"))?;

        for grid in &self.grids {
            let block = grid.layout().block_area();
            if quantizer.dimension() != block {
                return Err(CodecError::QuantizerDimensionMismatch {
                    quantizer: quantizer.dimension(),
                    block,
                });
            }
        }

        self.markers.check(|m| run_coder.marker_code(m))?;
        let escape = EscapeCode::for_count(quantizer.codebook_length());
        index_coder.set_escape(escape.width, escape.mask);

        Ok(VectorSession {
            grids: &mut self.grids,
            quantizer,
            run_coder,
            index_coder,
            writer,
            range: self.range,
            markers: self.markers,
        })
    }

    pub(crate) fn intra_session(&mut self) -> Result<IntraSession<'_, 'a>> {
        let run_coder = self
            .run_coder
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("run-length coder"))?;
        let intra_coder = self
            .intra_coder
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("intra coder"))?;
        let writer = self
            .writer
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("bit writer"))?;

        self.markers.check(|m| run_coder.marker_code(m))?;
        let escape = EscapeCode::for_count(2 * self.range.span());
        intra_coder.set_escape(escape.width, escape.mask);

        Ok(IntraSession {
            grids: &mut self.grids,
            run_coder,
            intra_coder,
            writer,
            range: self.range,
            markers: self.markers,
        })
    }
}

/// Collaborators of the quantizer based strategies for one `encode` call.
pub(crate) struct VectorSession<'s, 'a> {
    pub grids: &'s mut [EncodingGrid<'a>; 3],
    pub quantizer: &'s dyn VectorQuantizer,
    pub run_coder: &'s mut dyn SymbolEncoder,
    pub index_coder: &'s mut dyn SymbolEncoder,
    pub writer: &'s mut dyn BitStreamWriter,
    pub range: SampleRange,
    pub markers: FrameMarkers,
}

impl VectorSession<'_, '_> {
    /// Full residual and quantization statistics for every block.
    pub fn compute_all(&mut self) {
        for grid in self.grids.iter_mut() {
            grid.compute_residuals(Some(self.quantizer), Some(&mut *self.index_coder));
        }
    }

    /// Bits to keep free for the frame markers.
    pub fn marker_reserve(&self) -> u64 {
        3 * u64::from(self.markers.end_of_plane.length)
            + u64::from(self.markers.end_of_image.length)
    }
}

/// Collaborators of the intra strategy for one `encode` call.
pub(crate) struct IntraSession<'s, 'a> {
    pub grids: &'s mut [EncodingGrid<'a>; 3],
    pub run_coder: &'s mut dyn SymbolEncoder,
    pub intra_coder: &'s mut dyn SymbolEncoder,
    pub writer: &'s mut dyn BitStreamWriter,
    pub range: SampleRange,
    pub markers: FrameMarkers,
}
