use super::{DecodingStrategy, PlaneDecoder, RunStep, StreamSession};
use crate::encoder::{unzigzag, CodingReport, CodingStatus};
use crate::result::Result;

/// Reads run/differential pairs of an intra coded plane set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntraDecoding;

impl DecodingStrategy for IntraDecoding {
    fn decode(&self, decoder: &mut PlaneDecoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        let mut session = decoder.session(true, bit_budget)?;
        Ok(decode_intra(&mut session))
    }
}

fn decode_intra(session: &mut StreamSession<'_, '_>) -> CodingReport {
    let range = session.range;
    let mut coded = [0usize; 3];

    for channel in 0..3 {
        let escape = session.grids[channel].escape();
        session.run_decoder.set_escape(escape.width, escape.mask);
        let block_count = session.grids[channel].block_count();

        let mut predictor = range.midpoint();
        let mut position = 0;
        loop {
            let run = match session.read_run() {
                RunStep::Run(run) => run,
                RunStep::EndOfPlane => {
                    fill(session, channel, position..block_count, predictor);
                    break;
                }
                RunStep::EndOfImage | RunStep::Stop(CodingStatus::BudgetReached) => {
                    return finish_early(session, channel, position, predictor, coded);
                }
                RunStep::Stop(status) => return session.report(status, coded),
            };

            let index = position + run;
            if index >= block_count {
                log::error!(
                    "run of {} passes the end of channel {} at block {}",
                    run,
                    channel,
                    position
                );
                session.stop_from(channel, position);
                return session.report(CodingStatus::Desync, coded);
            }

            let code = match session
                .frame
                .read_value(&mut *session.value_decoder, &mut *session.reader)
            {
                Ok(code) => code,
                Err(CodingStatus::BudgetReached) => {
                    return finish_early(session, channel, position, predictor, coded);
                }
                Err(status) => return session.report(status, coded),
            };

            let value = predictor + unzigzag(code);
            if value < i32::from(range.min()) || value > i32::from(range.max()) {
                log::error!(
                    "differential {} leaves the sample range in channel {} block {}",
                    unzigzag(code),
                    channel,
                    index
                );
                session.stop_from(channel, index);
                return session.report(CodingStatus::Desync, coded);
            }

            fill(session, channel, position..index, predictor);
            session.grids[channel].set_scalar(index, value);
            predictor = value;
            coded[channel] += 1;
            position = index + 1;
        }

        session.grids[channel].reconstruct_scalar();
        log::debug!("channel {}: {} differentials", channel, coded[channel]);
    }

    session.report(CodingStatus::Complete, coded)
}

fn fill(
    session: &mut StreamSession<'_, '_>,
    channel: usize,
    blocks: std::ops::Range<usize>,
    value: i32,
) {
    for index in blocks {
        session.grids[channel].set_scalar(index, value);
    }
}

/// Infers the blocks the stream did not reach the way the encoder does:
/// the predictor for the rest of this channel, the reset value after it.
fn finish_early(
    session: &mut StreamSession<'_, '_>,
    channel: usize,
    position: usize,
    predictor: i32,
    coded: [usize; 3],
) -> CodingReport {
    let midpoint = session.range.midpoint();
    for c in channel..3 {
        let block_count = session.grids[c].block_count();
        let (start, value) = if c == channel {
            (position, predictor)
        } else {
            (0, midpoint)
        };
        fill(session, c, start..block_count, value);
        session.grids[c].reconstruct_scalar();
    }
    session.stop_from(channel, position);
    session.report(CodingStatus::BudgetReached, coded)
}
