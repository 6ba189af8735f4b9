use super::{add_clamped, block_mean, fill_clamped, BlockLayout};
use crate::options::SampleRange;
use crate::quantizer::VectorQuantizer;
use crate::result::Result;
use crate::vlc::{Codeword, EscapeCode, SymbolEncoder};
use ndarray::{s, ArrayView2, ArrayViewMut2};

/// Coding state of one block on the encoder side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CodedBlock {
    pub x: usize,
    pub y: usize,
    /// Selected for the stream.
    pub coded: bool,
    /// Still a candidate for selection.
    pub included: bool,
    pub vq_index: u32,
    pub vq_distortion: u64,
    /// Code word of `vq_index`, empty until the block has been quantized.
    pub code: Codeword,
    /// Sum of squared residual samples.
    pub uncoded_distortion: u64,
    /// Distortion removed by coding the block.
    pub weighted_distortion: i64,
}

/// Encoder side grid over one channel. Reads `source`, writes the
/// closed-loop reconstruction into `reference`.
pub struct EncodingGrid<'a> {
    source: ArrayView2<'a, i16>,
    reference: ArrayViewMut2<'a, i16>,
    layout: BlockLayout,
    blocks: Vec<CodedBlock>,
    residual: Vec<i32>,
}

impl<'a> EncodingGrid<'a> {
    pub fn new(
        source: ArrayView2<'a, i16>,
        reference: ArrayViewMut2<'a, i16>,
        image_width: usize,
        image_height: usize,
        block_width: usize,
        block_height: usize,
    ) -> Result<Self> {
        let layout = BlockLayout::new(image_width, image_height, block_width, block_height)?;
        layout.check_shape(source.dim())?;
        layout.check_shape(reference.dim())?;

        let blocks = (0..layout.block_count())
            .map(|index| {
                let (x, y) = layout.position(index);
                CodedBlock {
                    x,
                    y,
                    ..CodedBlock::default()
                }
            })
            .collect();

        Ok(Self {
            source,
            reference,
            layout,
            blocks,
            residual: vec![0; layout.block_area()],
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

    pub fn blocks(&self) -> &[CodedBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> &CodedBlock {
        &self.blocks[index]
    }

    pub(crate) fn block_mut(&mut self, index: usize) -> &mut CodedBlock {
        &mut self.blocks[index]
    }

    /// Residual of the block last passed to [`compute_residual`](Self::compute_residual).
    pub fn residual(&self) -> &[i32] {
        &self.residual
    }

    /// Refreshes the statistics of block `index` against the current reference.
    ///
    /// Without collaborators only the uncoded distortion is measured and the
    /// block stays a candidate whenever it differs from the reference. With
    /// both a quantizer and an index coder the residual is also quantized and
    /// the block is dropped when quantizing would not reduce its distortion.
    pub fn compute_residual(
        &mut self,
        index: usize,
        quantizer: Option<&dyn VectorQuantizer>,
        coder: Option<&mut dyn SymbolEncoder>,
    ) {
        let (bw, bh) = (self.layout.block_width(), self.layout.block_height());
        let block = &mut self.blocks[index];
        let (x, y) = (block.x, block.y);

        let source = self.source.slice(s![y..y + bh, x..x + bw]);
        let reference = self.reference.slice(s![y..y + bh, x..x + bw]);

        let mut uncoded = 0u64;
        for ((r, &s), &p) in self
            .residual
            .iter_mut()
            .zip(source.iter())
            .zip(reference.iter())
        {
            *r = i32::from(s) - i32::from(p);
            uncoded += (i64::from(*r) * i64::from(*r)) as u64;
        }

        block.coded = false;
        block.uncoded_distortion = uncoded;
        block.included = uncoded != 0;
        block.weighted_distortion = uncoded as i64;
        block.vq_index = 0;
        block.vq_distortion = 0;
        block.code = Codeword::NONE;

        if let (Some(quantizer), Some(coder)) = (quantizer, coder) {
            let (vq_index, vq_distortion) = quantizer.quantize(&self.residual);
            block.vq_index = vq_index;
            block.vq_distortion = vq_distortion;
            block.code = coder.encode(vq_index);
            block.weighted_distortion = uncoded as i64 - vq_distortion as i64;
            if block.weighted_distortion <= 0 {
                block.included = false;
            }
        }
    }

    /// [`compute_residual`](Self::compute_residual) for every block in raster order.
    pub fn compute_residuals(
        &mut self,
        quantizer: Option<&dyn VectorQuantizer>,
        mut coder: Option<&mut dyn SymbolEncoder>,
    ) {
        for index in 0..self.blocks.len() {
            let coder = coder.as_mut().map(|c| &mut **c as &mut dyn SymbolEncoder);
            self.compute_residual(index, quantizer, coder);
        }
    }

    /// Applies the quantized residual of block `index` to the reference.
    /// Returns `false` if the stored index is not in the codebook.
    pub fn reconstruct_block(
        &mut self,
        index: usize,
        quantizer: &dyn VectorQuantizer,
        range: SampleRange,
    ) -> bool {
        let CodedBlock { x, y, vq_index, .. } = self.blocks[index];
        let Some(delta) = quantizer.inverse_quantize(vq_index) else {
            return false;
        };
        let (bw, bh) = (self.layout.block_width(), self.layout.block_height());
        add_clamped(
            self.reference.slice_mut(s![y..y + bh, x..x + bw]),
            delta,
            range,
        );
        true
    }

    /// Sets every reference sample of block `index` to `value`.
    pub fn fill_block(&mut self, index: usize, value: i32, range: SampleRange) {
        let CodedBlock { x, y, .. } = self.blocks[index];
        let (bw, bh) = (self.layout.block_width(), self.layout.block_height());
        fill_clamped(
            self.reference.slice_mut(s![y..y + bh, x..x + bw]),
            value,
            range,
        );
    }

    /// Rounded mean of the source samples of block `index`.
    pub fn block_mean(&self, index: usize) -> i32 {
        let CodedBlock { x, y, .. } = self.blocks[index];
        let (bw, bh) = (self.layout.block_width(), self.layout.block_height());
        block_mean(self.source.slice(s![y..y + bh, x..x + bw]))
    }

    pub fn coded_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.coded).count()
    }
}
