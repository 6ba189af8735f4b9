use super::selection::{Admission, Selection};
use super::strategy::VectorSelection;
use super::{CodingReport, EncodingStrategy, PlaneEncoder, VectorSession};
use crate::grid::EncodingGrid;
use crate::result::Result;

/// Number of energy levels the candidates of a channel are split into.
pub const THRESHOLD_LEVELS: usize = 32;

/// Approximates the greedy order by coding blocks level by level, from the
/// highest energy level down. Quantizes every block up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FastHistogram;

/// Like [`FastHistogram`], but levels are derived from the uncoded
/// distortion and a block is only quantized once it clears a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeferredHistogram;

impl VectorSelection for FastHistogram {
    fn select(&self, session: &mut VectorSession<'_, '_>, available: u64) -> bool {
        session.compute_all();
        let thresholds = channel_thresholds(session.grids, |gain, _| gain.max(0) as u64);
        select_by_levels(session, available, &thresholds, false)
    }
}

impl VectorSelection for DeferredHistogram {
    fn select(&self, session: &mut VectorSession<'_, '_>, available: u64) -> bool {
        for grid in session.grids.iter_mut() {
            grid.compute_residuals(None, None);
        }
        let thresholds = channel_thresholds(session.grids, |_, uncoded| uncoded);
        select_by_levels(session, available, &thresholds, true)
    }
}

impl EncodingStrategy for FastHistogram {
    fn encode(&self, encoder: &mut PlaneEncoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        self.encode_vectors(encoder, bit_budget)
    }
}

impl EncodingStrategy for DeferredHistogram {
    fn encode(&self, encoder: &mut PlaneEncoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        self.encode_vectors(encoder, bit_budget)
    }
}

/// Splits the total energy of `values` into [`THRESHOLD_LEVELS`] equal shares.
///
/// Entry `k` is the value at which the energy of all larger values, taken in
/// decreasing order, first reaches `(k + 1) / 32` of the total. The last
/// entry is always zero, so every positive value clears it.
///
/// ```
/// use vqcodec_core::encoder::energy_thresholds;
///
/// let thresholds = energy_thresholds(vec![1, 8, 2, 4, 1]);
/// assert_eq!(thresholds[0], 8);
/// assert_eq!(thresholds[20], 4);
/// assert_eq!(thresholds[31], 0);
/// ```
pub fn energy_thresholds(mut values: Vec<u64>) -> [u64; THRESHOLD_LEVELS] {
    let mut thresholds = [0u64; THRESHOLD_LEVELS];
    values.sort_unstable_by(|a, b| b.cmp(a));

    let total: u128 = values.iter().map(|&v| u128::from(v)).sum();
    if total == 0 {
        return thresholds;
    }

    let mut cumulative = 0u128;
    let mut taken = 0usize;
    for (k, threshold) in thresholds
        .iter_mut()
        .take(THRESHOLD_LEVELS - 1)
        .enumerate()
    {
        let target = total * (k as u128 + 1) / THRESHOLD_LEVELS as u128;
        while taken < values.len() && cumulative < target {
            cumulative += u128::from(values[taken]);
            taken += 1;
        }
        *threshold = values[taken.saturating_sub(1)];
    }

    thresholds
}

/// Thresholds per channel over the energy of the included blocks.
fn channel_thresholds(
    grids: &[EncodingGrid<'_>; 3],
    energy: impl Fn(i64, u64) -> u64,
) -> [[u64; THRESHOLD_LEVELS]; 3] {
    let mut thresholds = [[0u64; THRESHOLD_LEVELS]; 3];
    for (channel, grid) in grids.iter().enumerate() {
        let values = grid
            .blocks()
            .iter()
            .filter(|b| b.included)
            .map(|b| energy(b.weighted_distortion, b.uncoded_distortion))
            .collect();
        thresholds[channel] = energy_thresholds(values);
        log::trace!("channel {} thresholds {:?}", channel, thresholds[channel]);
    }
    thresholds
}

/// Codes, level by level and channel by channel, every candidate above the
/// level's threshold. Stops at the first candidate that does not fit.
fn select_by_levels(
    session: &mut VectorSession<'_, '_>,
    available: u64,
    thresholds: &[[u64; THRESHOLD_LEVELS]; 3],
    deferred: bool,
) -> bool {
    let mut selection = Selection::new(available);

    for level in 0..THRESHOLD_LEVELS {
        for channel in 0..3 {
            let threshold = thresholds[channel][level];
            for index in 0..session.grids[channel].block_count() {
                let block = *session.grids[channel].block(index);
                if !block.included {
                    continue;
                }
                let energy = if deferred {
                    block.uncoded_distortion
                } else {
                    block.weighted_distortion.max(0) as u64
                };
                if energy <= threshold {
                    continue;
                }

                if deferred {
                    session.grids[channel].compute_residual(
                        index,
                        Some(session.quantizer),
                        Some(&mut *session.index_coder),
                    );
                    if !session.grids[channel].block(index).included {
                        continue;
                    }
                }

                if selection.admit(session, channel, index) == Admission::OverBudget {
                    log::debug!(
                        "histogram selection stopped at level {} after {} bits",
                        level,
                        selection.spent()
                    );
                    return true;
                }
            }
        }
    }
    false
}
