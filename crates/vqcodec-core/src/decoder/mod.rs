//! Plane set decoder, the mirror of [`crate::encoder`].

mod intra;
mod standard;
mod strategy;

pub use intra::IntraDecoding;
pub use standard::StandardDecoding;
pub use strategy::{DecoderStrategy, DecodingStrategy};

use crate::bitstream::BitStreamReader;
use crate::encoder::{CodingReport, CodingStatus};
use crate::error::CodecError;
use crate::grid::DecodingGrid;
use crate::options::{CodecOptions, FrameMarkers, SampleRange};
use crate::quantizer::VectorQuantizer;
use crate::result::Result;
use crate::vlc::{Decoded, EscapeCode, SymbolDecoder};

pub struct PlaneDecoder<'a> {
    grids: [DecodingGrid<'a>; 3],
    strategy: DecoderStrategy,
    range: SampleRange,
    markers: FrameMarkers,
    quantizer: Option<&'a dyn VectorQuantizer>,
    run_decoder: Option<&'a mut dyn SymbolDecoder>,
    index_decoder: Option<&'a mut dyn SymbolDecoder>,
    intra_decoder: Option<&'a mut dyn SymbolDecoder>,
    reader: Option<&'a mut dyn BitStreamReader>,
}

impl<'a> PlaneDecoder<'a> {
    /// Binds the three channel grids. All grids must use the block size of `options`.
    pub fn new(grids: [DecodingGrid<'a>; 3], options: &CodecOptions) -> Result<Self> {
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
            strategy: options.decoder_strategy(),
            range: options.sample_range,
            markers: options.markers,
            quantizer: None,
            run_decoder: None,
            index_decoder: None,
            intra_decoder: None,
            reader: None,
        })
    }

    pub fn attach_quantizer(&mut self, quantizer: &'a dyn VectorQuantizer) -> &mut Self {
        self.quantizer = Some(quantizer);
        self
    }

    pub fn attach_run_decoder(&mut self, decoder: &'a mut dyn SymbolDecoder) -> &mut Self {
        self.run_decoder = Some(decoder);
        self
    }

    pub fn attach_index_decoder(&mut self, decoder: &'a mut dyn SymbolDecoder) -> &mut Self {
        self.index_decoder = Some(decoder);
        self
    }

    pub fn attach_intra_decoder(&mut self, decoder: &'a mut dyn SymbolDecoder) -> &mut Self {
        self.intra_decoder = Some(decoder);
        self
    }

    pub fn attach_reader(&mut self, reader: &'a mut dyn BitStreamReader) -> &mut Self {
        self.reader = Some(reader);
        self
    }

    pub fn strategy(&self) -> DecoderStrategy {
        self.strategy
    }

    pub fn grids(&self) -> &[DecodingGrid<'a>; 3] {
        &self.grids
    }

    /// Reads at most `bit_budget` bits and applies them to the reference planes.
    ///
    /// Fails only when a collaborator the strategy needs is missing.
    pub fn decode(&mut self, bit_budget: u64) -> Result<CodingReport> {
        for grid in self.grids.iter_mut() {
            grid.reset();
        }
        let strategy = self.strategy;
        let report = strategy.decode(self, bit_budget)?;
        log::debug!(
            "decoded {:?} blocks from {} of {} bits, status {:?}",
            report.coded_blocks,
            report.bits_used,
            bit_budget,
            report.status
        );
        Ok(report)
    }

    pub(crate) fn session(
        &mut self,
        intra: bool,
        bit_budget: u64,
    ) -> Result<StreamSession<'_, 'a>> {
        let quantizer = match (intra, self.quantizer) {
            (true, _) => None,
            (false, Some(quantizer)) => Some(quantizer),
            (false, None) => return Err(CodecError::MissingCollaborator("vector quantizer")),
        };
        let run_decoder = self
            .run_decoder
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("run-length decoder"))?;
        let value_decoder = if intra {
            self.intra_decoder
                .as_deref_mut()
                .ok_or(CodecError::MissingCollaborator("intra decoder"))?
        } else {
            self.index_decoder
                .as_deref_mut()
                .ok_or(CodecError::MissingCollaborator("index decoder"))?
        };
        let reader = self
            .reader
            .as_deref_mut()
            .ok_or(CodecError::MissingCollaborator("bit reader"))?;

        self.markers.check(|m| run_decoder.marker_code(m))?;
        let escape = match quantizer {
            Some(quantizer) => {
                for grid in &self.grids {
                    let block = grid.layout().block_area();
                    if quantizer.dimension() != block {
                        return Err(CodecError::QuantizerDimensionMismatch {
                            quantizer: quantizer.dimension(),
                            block,
                        });
                    }
                }
                EscapeCode::for_count(quantizer.codebook_length())
            }
            None => EscapeCode::for_count(2 * self.range.span()),
        };
        value_decoder.set_escape(escape.width, escape.mask);

        Ok(StreamSession {
            grids: &mut self.grids,
            quantizer,
            run_decoder,
            value_decoder,
            reader,
            range: self.range,
            frame: FrameReader::new(self.markers, bit_budget),
        })
    }
}

/// Collaborators of one `decode` call. `value_decoder` reads quantizer
/// indices, or intra differentials when there is no quantizer.
pub(crate) struct StreamSession<'s, 'a> {
    pub grids: &'s mut [DecodingGrid<'a>; 3],
    pub quantizer: Option<&'s dyn VectorQuantizer>,
    pub run_decoder: &'s mut dyn SymbolDecoder,
    pub value_decoder: &'s mut dyn SymbolDecoder,
    pub reader: &'s mut dyn BitStreamReader,
    pub range: SampleRange,
    pub frame: FrameReader,
}

impl StreamSession<'_, '_> {
    pub fn read_run(&mut self) -> RunStep {
        self.frame.read_run(&mut *self.run_decoder, &mut *self.reader)
    }

    /// Marks everything from block `index` of `channel` on as not reached.
    pub fn stop_from(&mut self, channel: usize, index: usize) {
        for (c, grid) in self.grids.iter_mut().enumerate().skip(channel) {
            grid.mark_stop(if c == channel { index } else { 0 });
        }
    }

    pub fn report(&self, status: CodingStatus, coded_blocks: [usize; 3]) -> CodingReport {
        CodingReport::new(status, self.frame.bits_used(), coded_blocks)
    }
}

/// What the stream holds where a run is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStep {
    Run(usize),
    EndOfPlane,
    EndOfImage,
    Stop(CodingStatus),
}

/// Counts the bits taken from the stream against the budget.
#[derive(Debug)]
pub(crate) struct FrameReader {
    markers: FrameMarkers,
    budget: u64,
    used: u64,
}

impl FrameReader {
    fn new(markers: FrameMarkers, budget: u64) -> Self {
        Self {
            markers,
            budget,
            used: 0,
        }
    }

    pub fn bits_used(&self) -> u64 {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        self.budget.saturating_sub(self.used)
    }

    pub fn charge(&mut self, bits: u32) {
        self.used += u64::from(bits);
    }

    pub fn read_run(
        &mut self,
        decoder: &mut dyn SymbolDecoder,
        reader: &mut dyn BitStreamReader,
    ) -> RunStep {
        let decoded = decoder.decode(reader);
        let bits = decoder.bits_consumed();

        match decoded {
            Decoded::EndOfStream => {
                log::warn!("stream ended after {} bits", self.used);
                return RunStep::Stop(CodingStatus::BudgetReached);
            }
            Decoded::Invalid => {
                log::error!("no run-length code matches at bit {}", self.used);
                return RunStep::Stop(CodingStatus::Desync);
            }
            _ if u64::from(bits) > self.remaining() => {
                return RunStep::Stop(CodingStatus::BudgetReached);
            }
            _ => self.charge(bits),
        }

        match decoded {
            Decoded::Value(run) => RunStep::Run(run as usize),
            Decoded::Marker(code) if code == self.markers.end_of_plane => RunStep::EndOfPlane,
            Decoded::Marker(code) if code == self.markers.end_of_image => RunStep::EndOfImage,
            _ => {
                log::error!("unexpected marker {:?} at bit {}", decoded, self.used);
                RunStep::Stop(CodingStatus::Desync)
            }
        }
    }

    /// Reads one value code. `Err` carries the status to stop with.
    pub fn read_value(
        &mut self,
        decoder: &mut dyn SymbolDecoder,
        reader: &mut dyn BitStreamReader,
    ) -> std::result::Result<u32, CodingStatus> {
        match decoder.decode(reader) {
            Decoded::Value(value) => {
                let bits = decoder.bits_consumed();
                if u64::from(bits) > self.remaining() {
                    return Err(CodingStatus::BudgetReached);
                }
                self.charge(bits);
                Ok(value)
            }
            Decoded::EndOfStream => Err(CodingStatus::BudgetReached),
            Decoded::Marker(_) | Decoded::Invalid => {
                log::error!("no value code matches at bit {}", self.used);
                Err(CodingStatus::Desync)
            }
        }
    }
}
