use super::{CodingReport, CodingStatus, VectorSession};
use crate::bitstream::BitStreamWriter;
use crate::grid::EncodingGrid;
use crate::options::FrameMarkers;
use crate::vlc::Codeword;

/// Outcome of handing a code to [`FrameWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emit {
    Written,
    /// Not written, the budget would no longer hold the end-of-image marker.
    Full,
    /// Not written, the code is empty or the writer failed.
    Failed,
}

/// Budget keeping bit writer.
///
/// Every pair and every end-of-plane marker but the last is only written if
/// the end-of-image marker still fits behind it, so a frame can always be
/// terminated within the budget.
pub(crate) struct FrameWriter<'w> {
    writer: &'w mut dyn BitStreamWriter,
    markers: FrameMarkers,
    budget: u64,
    used: u64,
}

impl<'w> FrameWriter<'w> {
    pub fn new(writer: &'w mut dyn BitStreamWriter, markers: FrameMarkers, budget: u64) -> Self {
        Self {
            writer,
            markers,
            budget,
            used: 0,
        }
    }

    pub fn bits_used(&self) -> u64 {
        self.used
    }

    fn end_of_image_len(&self) -> u64 {
        u64::from(self.markers.end_of_image.length)
    }

    /// Writes a run code followed by a value code.
    pub fn put_pair(&mut self, run: Codeword, value: Codeword) -> Emit {
        if run.is_empty() || value.is_empty() {
            log::error!(
                "cannot emit an empty code (run {:?}, value {:?})",
                run,
                value
            );
            return Emit::Failed;
        }

        let cost = u64::from(run.length) + u64::from(value.length);
        if self.used + cost + self.end_of_image_len() > self.budget {
            return Emit::Full;
        }

        match self.put(run).and_then(|_| self.put(value)) {
            Ok(()) => Emit::Written,
            Err(_) => Emit::Failed,
        }
    }

    /// Closes a channel. The last channel needs no room for the end-of-image marker.
    pub fn end_plane(&mut self, last: bool) -> Emit {
        let marker = self.markers.end_of_plane;
        let reserve = if last { 0 } else { self.end_of_image_len() };
        if self.used + u64::from(marker.length) + reserve > self.budget {
            return Emit::Full;
        }
        match self.put(marker) {
            Ok(()) => Emit::Written,
            Err(_) => Emit::Failed,
        }
    }

    /// Terminates the frame early. Writes nothing if not even the marker fits.
    pub fn end_image(&mut self) -> Emit {
        let marker = self.markers.end_of_image;
        if self.used + u64::from(marker.length) > self.budget {
            log::warn!(
                "bit budget of {} cannot hold the end-of-image marker",
                self.budget
            );
            return Emit::Full;
        }
        match self.put(marker) {
            Ok(()) => Emit::Written,
            Err(_) => Emit::Failed,
        }
    }

    /// Report for a frame cut short by the budget.
    pub fn finish_early(&mut self, coded_blocks: [usize; 3]) -> CodingReport {
        let status = match self.end_image() {
            Emit::Failed => CodingStatus::Desync,
            Emit::Written | Emit::Full => CodingStatus::BudgetReached,
        };
        self.report(status, coded_blocks)
    }

    pub fn report(&self, status: CodingStatus, coded_blocks: [usize; 3]) -> CodingReport {
        CodingReport::new(status, self.used, coded_blocks)
    }

    fn put(&mut self, code: Codeword) -> std::io::Result<()> {
        self.writer
            .write_bits(code.length, code.bits)
            .map_err(|err| {
                log::error!("bit writer failed after {} bits: {}", self.used, err);
                err
            })?;
        self.used += u64::from(code.length);
        Ok(())
    }
}

/// Writes every `coded` block as a run/index pair, channel by channel, and
/// applies it to the reference right after it is written.
pub(crate) fn emit_vectors(session: &mut VectorSession<'_, '_>, bit_budget: u64) -> CodingReport {
    let mut frame = FrameWriter::new(&mut *session.writer, session.markers, bit_budget);
    let mut coded = [0usize; 3];

    for channel in 0..3 {
        let grid = &mut session.grids[channel];
        let escape = grid.escape();
        session.run_coder.set_escape(escape.width, escape.mask);

        let mut run = 0u32;
        for index in 0..grid.block_count() {
            let block = *grid.block(index);
            if !block.coded {
                run += 1;
                continue;
            }

            let run_code = session.run_coder.encode(run);
            let index_code = session.index_coder.encode(block.vq_index);
            match frame.put_pair(run_code, index_code) {
                Emit::Written => {}
                Emit::Full => {
                    uncode_from(session.grids, channel, index);
                    return frame.finish_early(coded);
                }
                Emit::Failed => return frame.report(CodingStatus::Desync, coded),
            }

            if !grid.reconstruct_block(index, session.quantizer, session.range) {
                log::error!("index {} is not in the codebook", block.vq_index);
                return frame.report(CodingStatus::Desync, coded);
            }
            log::trace!(
                "channel {} block {} after run {}: index {}",
                channel,
                index,
                run,
                block.vq_index
            );
            coded[channel] += 1;
            run = 0;
        }

        match frame.end_plane(channel == 2) {
            Emit::Written => {}
            Emit::Full => {
                uncode_from(session.grids, channel + 1, 0);
                return frame.finish_early(coded);
            }
            Emit::Failed => return frame.report(CodingStatus::Desync, coded),
        }
        log::debug!(
            "channel {}: {} blocks, {} bits so far",
            channel,
            coded[channel],
            frame.bits_used()
        );
    }

    frame.report(CodingStatus::Complete, coded)
}

/// Blocks the stream no longer reaches are not coded.
fn uncode_from(grids: &mut [EncodingGrid<'_>; 3], channel: usize, index: usize) {
    for (c, grid) in grids.iter_mut().enumerate().skip(channel) {
        let first = if c == channel { index } else { 0 };
        for block in first..grid.block_count() {
            grid.block_mut(block).coded = false;
        }
    }
}
