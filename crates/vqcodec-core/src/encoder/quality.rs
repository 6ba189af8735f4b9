use super::standard::select_greedy;
use super::strategy::VectorSelection;
use super::{CodingReport, EncodingStrategy, PlaneEncoder, VectorSession};
use crate::result::Result;

/// Greedy selection that leaves blocks alone whose uncoded distortion is
/// already below `threshold`.
///
/// The same threshold applies to luminance and chroma.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConstantQuality {
    pub threshold: u64,
}

impl VectorSelection for ConstantQuality {
    fn select(&self, session: &mut VectorSession<'_, '_>, available: u64) -> bool {
        session.compute_all();

        let mut dropped = 0usize;
        for grid in session.grids.iter_mut() {
            for index in 0..grid.block_count() {
                let block = grid.block_mut(index);
                if block.included && block.uncoded_distortion < self.threshold {
                    block.included = false;
                    dropped += 1;
                }
            }
        }
        log::debug!(
            "{} blocks already below the quality threshold {}",
            dropped,
            self.threshold
        );

        select_greedy(session, available)
    }
}

impl EncodingStrategy for ConstantQuality {
    fn encode(&self, encoder: &mut PlaneEncoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        self.encode_vectors(encoder, bit_budget)
    }
}
