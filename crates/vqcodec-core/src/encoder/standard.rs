use super::selection::{Admission, Selection};
use super::strategy::VectorSelection;
use super::{CodingReport, EncodingStrategy, PlaneEncoder, VectorSession};
use crate::grid::EncodingGrid;
use crate::result::Result;

/// Greedy selection: always codes the candidate with the largest gain next,
/// over all three channels, until the next one no longer fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Standard;

impl VectorSelection for Standard {
    fn select(&self, session: &mut VectorSession<'_, '_>, available: u64) -> bool {
        session.compute_all();
        select_greedy(session, available)
    }
}

impl EncodingStrategy for Standard {
    fn encode(&self, encoder: &mut PlaneEncoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        self.encode_vectors(encoder, bit_budget)
    }
}

/// Codes candidates in order of decreasing weighted distortion. Returns
/// `true` if it stopped because the next candidate did not fit.
pub(crate) fn select_greedy(session: &mut VectorSession<'_, '_>, available: u64) -> bool {
    let mut selection = Selection::new(available);

    while let Some((channel, index)) = best_candidate(session.grids) {
        if selection.admit(session, channel, index) == Admission::OverBudget {
            log::debug!(
                "greedy selection stopped at channel {} block {} after {} bits",
                channel,
                index,
                selection.spent()
            );
            return true;
        }
    }
    false
}

/// First included block with the largest weighted distortion.
fn best_candidate(grids: &[EncodingGrid<'_>; 3]) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize, i64)> = None;
    for (channel, grid) in grids.iter().enumerate() {
        for (index, block) in grid.blocks().iter().enumerate() {
            if block.included && best.map_or(true, |(_, _, gain)| block.weighted_distortion > gain)
            {
                best = Some((channel, index, block.weighted_distortion));
            }
        }
    }
    best.map(|(channel, index, _)| (channel, index))
}
