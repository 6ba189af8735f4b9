use super::emission::{Emit, FrameWriter};
use super::{CodingReport, CodingStatus, EncodingStrategy, IntraSession, PlaneEncoder};
use crate::grid::EncodingGrid;
use crate::options::SampleRange;
use crate::result::Result;

/// Codes every block as its mean, predicted from the mean of the previous
/// block of the channel. No quantizer is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntraPrediction;

impl EncodingStrategy for IntraPrediction {
    fn encode(&self, encoder: &mut PlaneEncoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        let mut session = encoder.intra_session()?;
        Ok(encode_intra(&mut session, bit_budget))
    }
}

/// Maps a non-zero differential onto the codes `0, 1, 2, ...` as `+1, -1, +2, -2, ...`.
pub(crate) fn zigzag(diff: i32) -> u32 {
    if diff > 0 {
        (2 * diff - 2) as u32
    } else {
        (-2 * diff - 1) as u32
    }
}

/// Inverse of [`zigzag`].
pub(crate) fn unzigzag(code: u32) -> i32 {
    let code = code as i64;
    let diff = if code % 2 == 0 {
        code / 2 + 1
    } else {
        -(code + 1) / 2
    };
    diff as i32
}

fn encode_intra(session: &mut IntraSession<'_, '_>, bit_budget: u64) -> CodingReport {
    let range = session.range;
    let mut frame = FrameWriter::new(&mut *session.writer, session.markers, bit_budget);
    let mut coded = [0usize; 3];

    for channel in 0..3 {
        let grid = &mut session.grids[channel];
        let escape = grid.escape();
        session.run_coder.set_escape(escape.width, escape.mask);

        let mut predictor = range.midpoint();
        let mut run = 0u32;
        for index in 0..grid.block_count() {
            grid.block_mut(index).coded = false;
            let mean = i32::from(range.clamp(grid.block_mean(index)));
            let diff = mean - predictor;
            if diff == 0 {
                grid.fill_block(index, predictor, range);
                run += 1;
                continue;
            }

            let run_code = session.run_coder.encode(run);
            let value_code = session.intra_coder.encode(zigzag(diff));
            match frame.put_pair(run_code, value_code) {
                Emit::Written => {}
                Emit::Full => {
                    // the decoder repeats the predictor up to the end of the channel
                    for rest in index..grid.block_count() {
                        grid.block_mut(rest).coded = false;
                        grid.fill_block(rest, predictor, range);
                    }
                    fill_remaining_channels(&mut *session.grids, channel + 1, range);
                    return frame.finish_early(coded);
                }
                Emit::Failed => return frame.report(CodingStatus::Desync, coded),
            }

            grid.fill_block(index, mean, range);
            grid.block_mut(index).coded = true;
            log::trace!(
                "channel {} block {} after run {}: mean {} ({:+})",
                channel,
                index,
                run,
                mean,
                diff
            );
            predictor = mean;
            coded[channel] += 1;
            run = 0;
        }

        match frame.end_plane(channel == 2) {
            Emit::Written => {}
            Emit::Full => {
                fill_remaining_channels(&mut *session.grids, channel + 1, range);
                return frame.finish_early(coded);
            }
            Emit::Failed => return frame.report(CodingStatus::Desync, coded),
        }
        log::debug!(
            "channel {}: {} of {} blocks predicted with a differential",
            channel,
            coded[channel],
            session.grids[channel].block_count()
        );
    }

    frame.report(CodingStatus::Complete, coded)
}

/// Channels the stream never reaches decode to the reset value.
fn fill_remaining_channels(grids: &mut [EncodingGrid<'_>; 3], first: usize, range: SampleRange) {
    for grid in grids.iter_mut().skip(first) {
        for index in 0..grid.block_count() {
            grid.block_mut(index).coded = false;
            grid.fill_block(index, range.midpoint(), range);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zigzag() {
        let diffs = [1, -1, 2, -2, 3, -255, 255];
        let codes: Vec<u32> = diffs.iter().map(|&d| zigzag(d)).collect();

        assert_eq!(codes, vec![0, 1, 2, 3, 4, 509, 508]);
        for (&diff, &code) in diffs.iter().zip(codes.iter()) {
            assert_eq!(unzigzag(code), diff);
        }
    }
}
