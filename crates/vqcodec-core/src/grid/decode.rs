use super::{add_clamped, fill_clamped, BlockLayout};
use crate::bitstream::BitStreamReader;
use crate::options::SampleRange;
use crate::quantizer::VectorQuantizer;
use crate::result::Result;
use crate::vlc::{Decoded, EscapeCode, SymbolDecoder};
use ndarray::{s, ArrayViewMut2};

/// Decoding state of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedBlock {
    pub x: usize,
    pub y: usize,
    /// The block carries a value and must be reconstructed.
    pub included: bool,
    /// Decoding ended before this block.
    pub stop: bool,
    /// Quantizer index, or the block's sample value for intra coded planes.
    pub value: i32,
}

/// Where [`DecodingGrid::reconstruct_vector`] takes its index from when it
/// reads the stream.
pub struct IndexStream<'s> {
    pub decoder: &'s mut dyn SymbolDecoder,
    pub reader: &'s mut dyn BitStreamReader,
    /// Bits the index may take before the budget is exceeded.
    pub allowance: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconstruction {
    /// The block was reconstructed; `bits` were read for its index.
    Applied { bits: u32 },
    /// The index would exceed the allowance.
    OverBudget,
    /// The stream ended inside the index.
    Truncated,
    /// The stream does not hold a valid index here.
    Desync,
}

/// Decoder side grid over one channel, writing into the caller's reference plane.
pub struct DecodingGrid<'a> {
    reference: ArrayViewMut2<'a, i16>,
    layout: BlockLayout,
    range: SampleRange,
    blocks: Vec<DecodedBlock>,
}

impl<'a> DecodingGrid<'a> {
    pub fn new(
        reference: ArrayViewMut2<'a, i16>,
        image_width: usize,
        image_height: usize,
        block_width: usize,
        block_height: usize,
        range: SampleRange,
    ) -> Result<Self> {
        let layout = BlockLayout::new(image_width, image_height, block_width, block_height)?;
        layout.check_shape(reference.dim())?;

        let blocks = (0..layout.block_count())
            .map(|index| {
                let (x, y) = layout.position(index);
                DecodedBlock {
                    x,
                    y,
                    ..DecodedBlock::default()
                }
            })
            .collect();

        Ok(Self {
            reference,
            layout,
            range,
            blocks,
        })
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn block_count(&self) -> usize {
        self.layout.block_count()
    }

    pub fn escape(&self) -> EscapeCode {
        self.layout.escape()
    }

    pub fn range(&self) -> SampleRange {
        self.range
    }

    pub fn blocks(&self) -> &[DecodedBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> &DecodedBlock {
        &self.blocks[index]
    }

    /// Forgets everything decoded so far. The reference plane is left as is.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.included = false;
            block.stop = false;
            block.value = 0;
        }
    }

    /// Flags every block from `index` on as not reached.
    pub fn mark_stop(&mut self, index: usize) {
        for block in self.blocks.iter_mut().skip(index) {
            block.stop = true;
        }
    }

    pub fn set_scalar(&mut self, index: usize, value: i32) {
        let block = &mut self.blocks[index];
        block.included = true;
        block.value = value;
    }

    /// Reconstructs block `index` from a quantizer index.
    ///
    /// With a stream the index is decoded from it and stored in the block,
    /// otherwise the stored index is replayed. Nothing is written to the
    /// reference unless the result is [`Reconstruction::Applied`].
    pub fn reconstruct_vector(
        &mut self,
        index: usize,
        quantizer: &dyn VectorQuantizer,
        stream: Option<IndexStream<'_>>,
    ) -> Reconstruction {
        let mut bits = 0;
        if let Some(IndexStream {
            decoder,
            reader,
            allowance,
        }) = stream
        {
            let value = match decoder.decode(reader) {
                Decoded::Value(value) => value,
                Decoded::EndOfStream => return Reconstruction::Truncated,
                Decoded::Marker(_) | Decoded::Invalid => return Reconstruction::Desync,
            };
            bits = decoder.bits_consumed();
            if u64::from(bits) > allowance {
                return Reconstruction::OverBudget;
            }
            let block = &mut self.blocks[index];
            block.included = true;
            block.value = value as i32;
        }

        let DecodedBlock { x, y, value, .. } = self.blocks[index];
        let Some(delta) = u32::try_from(value)
            .ok()
            .and_then(|v| quantizer.inverse_quantize(v))
        else {
            log::error!("index {} is not in the codebook", value);
            return Reconstruction::Desync;
        };

        let (bw, bh) = (self.layout.block_width(), self.layout.block_height());
        add_clamped(
            self.reference.slice_mut(s![y..y + bh, x..x + bw]),
            delta,
            self.range,
        );
        Reconstruction::Applied { bits }
    }

    /// Replays every included block up to the first one flagged `stop`.
    /// Returns the number of blocks reconstructed.
    pub fn reconstruct_vectors(&mut self, quantizer: &dyn VectorQuantizer) -> usize {
        let mut count = 0;
        for index in 0..self.blocks.len() {
            let block = self.blocks[index];
            if block.stop {
                break;
            }
            if block.included
                && matches!(
                    self.reconstruct_vector(index, quantizer, None),
                    Reconstruction::Applied { .. }
                )
            {
                count += 1;
            }
        }
        count
    }

    /// Fills every included block with its stored sample value.
    pub fn reconstruct_scalar(&mut self) {
        let (bw, bh) = (self.layout.block_width(), self.layout.block_height());
        for block in &self.blocks {
            if block.included {
                fill_clamped(
                    self.reference
                        .slice_mut(s![block.y..block.y + bh, block.x..block.x + bw]),
                    block.value,
                    self.range,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::{finish_stream, BitStreamWriter};
    use crate::quantizer::CodebookQuantizer;
    use crate::vlc::{SymbolEncoder, VlcTable};
    use bitstream_io::{BigEndian, BitReader, BitWriter};
    use ndarray::{array, Array2};
    use std::io::Cursor;

    #[test]
    fn test_clamps_to_the_sample_range() {
        let mut reference = Array2::from_elem((2, 2), 60i16);
        let quantizer = CodebookQuantizer::flat_levels(4, 20, 2).unwrap();
        let range = SampleRange::new(0, 63).unwrap();

        let mut grid = DecodingGrid::new(reference.view_mut(), 2, 2, 2, 2, range).unwrap();
        grid.set_scalar(0, 0);
        assert_eq!(grid.reconstruct_vectors(&quantizer), 1);
        drop(grid);

        assert_eq!(reference, array![[63, 63], [63, 63]]);
    }

    #[test]
    fn test_replay_stops_at_stop_flag() {
        let mut reference = Array2::from_elem((2, 6), 10i16);
        let quantizer = CodebookQuantizer::flat_levels(4, 1, 2).unwrap();

        let mut grid =
            DecodingGrid::new(reference.view_mut(), 6, 2, 2, 2, SampleRange::default()).unwrap();
        grid.set_scalar(0, 0);
        grid.set_scalar(2, 1);
        grid.mark_stop(1);
        assert_eq!(grid.reconstruct_vectors(&quantizer), 1);
        assert!(grid.block(2).stop);
        drop(grid);

        assert_eq!(reference, array![[11, 11, 10, 10, 10, 10], [11, 11, 10, 10, 10, 10]]);
    }

    #[test]
    fn test_reads_index_from_stream() {
        let table = VlcTable::index().unwrap();
        let mut encoder = table.encoder();
        let mut decoder = table.decoder();
        encoder.set_escape(4, 15);
        decoder.set_escape(4, 15);
        let code = encoder.encode(11);

        let mut writer = BitWriter::endian(Vec::new(), BigEndian);
        writer.write_bits(code.length, code.bits).unwrap();
        let bytes = finish_stream(writer).unwrap();

        let mut reference = Array2::from_elem((2, 2), 100i16);
        let quantizer = CodebookQuantizer::flat_levels(4, 1, 12).unwrap();
        let mut grid =
            DecodingGrid::new(reference.view_mut(), 2, 2, 2, 2, SampleRange::default()).unwrap();

        let mut reader = BitReader::endian(Cursor::new(bytes.clone()), BigEndian);
        let stream = IndexStream {
            decoder: &mut decoder,
            reader: &mut reader,
            allowance: u64::from(code.length) - 1,
        };
        assert_eq!(
            grid.reconstruct_vector(0, &quantizer, Some(stream)),
            Reconstruction::OverBudget
        );

        let mut reader = BitReader::endian(Cursor::new(bytes), BigEndian);
        let stream = IndexStream {
            decoder: &mut decoder,
            reader: &mut reader,
            allowance: u64::from(code.length),
        };
        assert_eq!(
            grid.reconstruct_vector(0, &quantizer, Some(stream)),
            Reconstruction::Applied { bits: code.length }
        );
        assert_eq!(grid.block(0).value, 11);
        drop(grid);

        // index 11 is the offset -6
        assert_eq!(reference, Array2::from_elem((2, 2), 94i16));
    }

    #[test]
    fn test_scalar_fill() {
        let mut reference = Array2::from_elem((2, 4), 5i16);
        let mut grid =
            DecodingGrid::new(reference.view_mut(), 4, 2, 2, 2, SampleRange::default()).unwrap();
        grid.set_scalar(1, 300);
        grid.reconstruct_scalar();
        drop(grid);

        assert_eq!(reference, array![[5, 5, 255, 255], [5, 5, 255, 255]]);
    }
}
