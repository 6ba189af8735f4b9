use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::PathBuf;

use bitstream_io::{BigEndian, BitReader};
use clap::Args;
use vqcodec_core::{CodebookQuantizer, CodecOptions, CodingStatus, PlaneDecoder, VlcTable};

use crate::cli::FrameArgs;
use crate::CliResult;

/// Applies a stream to a reference and stores the reconstructed frame
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Stream produced by `encode`
    #[arg(short = 'i', long = "in", value_name = "stream file", required = true)]
    pub stream: PathBuf,

    /// The reconstructed frame will be stored in this file
    #[arg(short = 'o', long = "out", value_name = "frame file", required = true)]
    pub output: PathBuf,

    #[command(flatten)]
    pub frame: FrameArgs,
}

impl DecodeArgs {
    pub fn run(self, options: &CodecOptions, quantizer: &CodebookQuantizer) -> CliResult<()> {
        let bytes = fs::read(&self.stream)?;
        let mut planes = self.frame.load_reference(options.sample_range)?;

        let (runs, indices, intra) = (
            VlcTable::run_length()?,
            VlcTable::index()?,
            VlcTable::intra()?,
        );
        let (mut run_decoder, mut index_decoder, mut intra_decoder) =
            (runs.decoder(), indices.decoder(), intra.decoder());
        let mut reader = BitReader::endian(Cursor::new(bytes), BigEndian);

        let report = {
            let grids = planes.decoding_grids(
                options.block_width,
                options.block_height,
                options.sample_range,
            )?;
            let mut decoder = PlaneDecoder::new(grids, options)?;
            decoder
                .attach_quantizer(quantizer)
                .attach_run_decoder(&mut run_decoder)
                .attach_index_decoder(&mut index_decoder)
                .attach_intra_decoder(&mut intra_decoder)
                .attach_reader(&mut reader);
            decoder.decode(self.frame.budget)?
        };

        if report.status == CodingStatus::Desync {
            log::error!(
                "stream {} is corrupt, the frame should be discarded",
                self.stream.display()
            );
        }
        let mut out = BufWriter::new(File::create(&self.output)?);
        planes.write_frame(&mut out, self.frame.depth())?;
        out.flush()?;

        println!(
            "status {} bits {} blocks {:?}",
            u8::from(report.status),
            report.bits_used,
            report.coded_blocks
        );
        Ok(())
    }
}
