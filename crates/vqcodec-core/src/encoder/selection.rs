use super::VectorSession;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Coded,
    /// The block has no code; it is dropped from the candidates.
    Unencodable,
    OverBudget,
}

/// Blocks selected so far and the exact number of bits their run and index
/// codes take in the stream.
pub(crate) struct Selection {
    coded: [BTreeSet<usize>; 3],
    spent: i64,
    available: i64,
}

impl Selection {
    pub fn new(available: u64) -> Self {
        Self {
            coded: Default::default(),
            spent: 0,
            available: i64::try_from(available).unwrap_or(i64::MAX),
        }
    }

    pub fn spent(&self) -> i64 {
        self.spent
    }

    /// Change in stream size if block `index` of `channel` is coded as well.
    ///
    /// The block pays for the run from the previous coded block and for its
    /// index. If a coded block follows, that block's run shrinks, which may
    /// change the length of its run code.
    pub fn cost(
        &self,
        session: &mut VectorSession<'_, '_>,
        channel: usize,
        index: usize,
    ) -> Option<i64> {
        let grid = &session.grids[channel];
        let escape = grid.escape();
        session.run_coder.set_escape(escape.width, escape.mask);

        let coded = &self.coded[channel];
        let start = coded.range(..index).next_back().map_or(0, |&prev| prev + 1);
        let run = session.run_coder.encode((index - start) as u32);
        let code = grid.block(index).code;
        if run.is_empty() || code.is_empty() {
            return None;
        }

        let mut cost = i64::from(run.length) + i64::from(code.length);
        if let Some(&next) = coded.range(index + 1..).next() {
            let before = session.run_coder.encode((next - start) as u32);
            let after = session.run_coder.encode((next - index - 1) as u32);
            if after.is_empty() {
                return None;
            }
            cost += i64::from(after.length) - i64::from(before.length);
        }
        Some(cost)
    }

    /// Codes the block if its cost fits the remaining budget.
    pub fn admit(
        &mut self,
        session: &mut VectorSession<'_, '_>,
        channel: usize,
        index: usize,
    ) -> Admission {
        let Some(cost) = self.cost(session, channel, index) else {
            session.grids[channel].block_mut(index).included = false;
            return Admission::Unencodable;
        };
        if self.spent + cost > self.available {
            return Admission::OverBudget;
        }

        self.spent += cost;
        self.coded[channel].insert(index);
        let block = session.grids[channel].block_mut(index);
        block.coded = true;
        block.included = false;
        log::trace!(
            "coding channel {} block {} for {} bits, gain {}",
            channel,
            index,
            cost,
            block.weighted_distortion
        );
        Admission::Coded
    }
}
