use super::{DecodingStrategy, PlaneDecoder, RunStep, StreamSession};
use crate::encoder::{CodingReport, CodingStatus};
use crate::grid::{IndexStream, Reconstruction};
use crate::result::Result;

/// Reads run/index pairs and adds the quantized residuals to the reference.
/// Serves every quantizer based encoder strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StandardDecoding;

impl DecodingStrategy for StandardDecoding {
    fn decode(&self, decoder: &mut PlaneDecoder<'_>, bit_budget: u64) -> Result<CodingReport> {
        let mut session = decoder.session(false, bit_budget)?;
        Ok(decode_vectors(&mut session))
    }
}

fn decode_vectors(session: &mut StreamSession<'_, '_>) -> CodingReport {
    let Some(quantizer) = session.quantizer else {
        return session.report(CodingStatus::Desync, [0; 3]);
    };
    let mut coded = [0usize; 3];

    for channel in 0..3 {
        let escape = session.grids[channel].escape();
        session.run_decoder.set_escape(escape.width, escape.mask);
        let block_count = session.grids[channel].block_count();

        let mut position = 0;
        loop {
            let run = match session.read_run() {
                RunStep::Run(run) => run,
                RunStep::EndOfPlane => break,
                RunStep::EndOfImage => {
                    session.stop_from(channel, position);
                    return session.report(CodingStatus::BudgetReached, coded);
                }
                RunStep::Stop(status) => {
                    session.stop_from(channel, position);
                    return session.report(status, coded);
                }
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

            let stream = IndexStream {
                decoder: &mut *session.value_decoder,
                reader: &mut *session.reader,
                allowance: session.frame.remaining(),
            };
            match session.grids[channel].reconstruct_vector(index, quantizer, Some(stream)) {
                Reconstruction::Applied { bits } => session.frame.charge(bits),
                Reconstruction::OverBudget | Reconstruction::Truncated => {
                    session.stop_from(channel, index);
                    return session.report(CodingStatus::BudgetReached, coded);
                }
                Reconstruction::Desync => {
                    log::error!("no index code matches in channel {} block {}", channel, index);
                    session.stop_from(channel, index);
                    return session.report(CodingStatus::Desync, coded);
                }
            }

            log::trace!("channel {} block {} after run {}", channel, index, run);
            coded[channel] += 1;
            position = index + 1;
        }

        log::debug!("channel {}: {} blocks", channel, coded[channel]);
    }

    session.report(CodingStatus::Complete, coded)
}

#[cfg(test)]
mod tests {
    use crate::bitstream::{finish_stream, BitStreamWriter};
    use crate::options::CodecOptions;
    use crate::plane::{Chroma, PlaneSet};
    use crate::quantizer::CodebookQuantizer;
    use crate::vlc::{SymbolEncoder, VlcTable};
    use crate::{CodingStatus, PlaneDecoder};
    use bitstream_io::{BigEndian, BitReader, BitWriter};
    use std::io::Cursor;

    #[test]
    fn test_run_past_the_plane_flags_every_block() {
        let (runs, indices) = (VlcTable::run_length().unwrap(), VlcTable::index().unwrap());
        let quantizer = CodebookQuantizer::flat_levels(16, 2, 8).unwrap();

        // two luma blocks, a run of five skips past both
        let mut writer = BitWriter::endian(Vec::new(), BigEndian);
        let run = runs.encoder().encode(5);
        writer.write_bits(run.length, run.bits).unwrap();
        let bytes = finish_stream(writer).unwrap();

        let mut frame = PlaneSet::blank(8, 4, Chroma::Yuv444, 128);
        let (mut run_decoder, mut index_decoder) = (runs.decoder(), indices.decoder());
        let mut reader = BitReader::endian(Cursor::new(bytes), BigEndian);
        let options = CodecOptions::default();
        let grids = frame.decoding_grids(4, 4, options.sample_range).unwrap();
        let mut decoder = PlaneDecoder::new(grids, &options).unwrap();
        decoder
            .attach_quantizer(&quantizer)
            .attach_run_decoder(&mut run_decoder)
            .attach_index_decoder(&mut index_decoder)
            .attach_reader(&mut reader);

        let report = decoder.decode(1000).unwrap();
        assert_eq!(report.status, CodingStatus::Desync);
        assert!(decoder
            .grids()
            .iter()
            .flat_map(|grid| grid.blocks())
            .all(|block| block.stop && !block.included));
    }
}
