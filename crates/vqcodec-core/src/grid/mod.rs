//! Block grids over one colour channel.
//!
//! A plane is split into a raster of equally sized, non-overlapping blocks.
//! Samples right of the last full block column or below the last full block
//! row are never coded. The grids borrow the caller's planes and keep one
//! metadata record per block.

mod decode;
mod encode;

pub use decode::{DecodedBlock, DecodingGrid, IndexStream, Reconstruction};
pub use encode::{CodedBlock, EncodingGrid};

use crate::error::CodecError;
use crate::options::SampleRange;
use crate::result::Result;
use crate::vlc::EscapeCode;
use ndarray::{ArrayView2, ArrayViewMut2};

/// Geometry shared by the encode and decode grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLayout {
    plane_width: usize,
    plane_height: usize,
    block_width: usize,
    block_height: usize,
    blocks_per_row: usize,
    block_count: usize,
}

impl BlockLayout {
    pub fn new(
        plane_width: usize,
        plane_height: usize,
        block_width: usize,
        block_height: usize,
    ) -> Result<Self> {
        if plane_width == 0 || plane_height == 0 || block_width == 0 || block_height == 0 {
            return Err(CodecError::InvalidDimensions(
                plane_width,
                plane_height,
                block_width,
                block_height,
            ));
        }

        let blocks_per_row = plane_width / block_width;
        Ok(Self {
            plane_width,
            plane_height,
            block_width,
            block_height,
            blocks_per_row,
            block_count: blocks_per_row * (plane_height / block_height),
        })
    }

    /// Top-left sample `(x, y)` of block `index`.
    pub fn position(&self, index: usize) -> (usize, usize) {
        (
            (index % self.blocks_per_row) * self.block_width,
            (index / self.blocks_per_row) * self.block_height,
        )
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn block_width(&self) -> usize {
        self.block_width
    }

    pub fn block_height(&self) -> usize {
        self.block_height
    }

    pub fn block_area(&self) -> usize {
        self.block_width * self.block_height
    }

    pub fn plane_width(&self) -> usize {
        self.plane_width
    }

    pub fn plane_height(&self) -> usize {
        self.plane_height
    }

    /// Escape literal able to address every block of the plane.
    pub fn escape(&self) -> EscapeCode {
        EscapeCode::for_count(self.block_count)
    }

    /// ndarray shapes are `(rows, columns)`.
    pub(crate) fn check_shape(&self, shape: (usize, usize)) -> Result<()> {
        let (got_height, got_width) = shape;
        if got_width != self.plane_width || got_height != self.plane_height {
            return Err(CodecError::BufferShapeMismatch {
                width: self.plane_width,
                height: self.plane_height,
                got_width,
                got_height,
            });
        }
        Ok(())
    }
}

/// Adds `delta` to the block sample by sample, saturating at the range limits.
pub(crate) fn add_clamped(mut block: ArrayViewMut2<'_, i16>, delta: &[i32], range: SampleRange) {
    for (sample, &d) in block.iter_mut().zip(delta) {
        *sample = range.clamp(i32::from(*sample) + d);
    }
}

pub(crate) fn fill_clamped(mut block: ArrayViewMut2<'_, i16>, value: i32, range: SampleRange) {
    block.fill(range.clamp(value));
}

/// Mean of the block, rounded half up.
pub(crate) fn block_mean(block: ArrayView2<'_, i16>) -> i32 {
    let count = block.len() as i64;
    let sum: i64 = block.iter().map(|&s| i64::from(s)).sum();
    (2 * sum + count).div_euclid(2 * count) as i32
}
