use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use bitstream_io::{BigEndian, BitWriter};
use clap::Args;
use vqcodec_core::{
    finish_stream, CodebookQuantizer, CodecOptions, PlaneEncoder, PlaneSet, VlcTable,
};

use crate::cli::FrameArgs;
use crate::CliResult;

/// Codes a raw frame against a reference into a budgeted stream
#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Raw planar frame to code
    #[arg(short = 'i', long = "in", value_name = "source frame", required = true)]
    pub source: PathBuf,

    /// The stream will be stored in this file
    #[arg(short = 'o', long = "out", value_name = "stream file", required = true)]
    pub stream: PathBuf,

    /// Also store the reference as the decoder will see it
    #[arg(long, value_name = "frame file")]
    pub recon: Option<PathBuf>,

    #[command(flatten)]
    pub frame: FrameArgs,
}

impl EncodeArgs {
    pub fn run(self, options: &CodecOptions, quantizer: &CodebookQuantizer) -> CliResult<()> {
        let source = self
            .frame
            .read_frame(&mut BufReader::new(File::open(&self.source)?))?;
        let mut reference = self.frame.load_reference(options.sample_range)?;

        let (runs, indices, intra) = (
            VlcTable::run_length()?,
            VlcTable::index()?,
            VlcTable::intra()?,
        );
        let (mut run_coder, mut index_coder, mut intra_coder) =
            (runs.encoder(), indices.encoder(), intra.encoder());
        let mut writer = BitWriter::endian(Vec::new(), BigEndian);

        let report = {
            let grids = PlaneSet::encoding_grids(
                &source,
                &mut reference,
                options.block_width,
                options.block_height,
            )?;
            let mut encoder = PlaneEncoder::new(grids, options)?;
            encoder
                .attach_quantizer(quantizer)
                .attach_run_coder(&mut run_coder)
                .attach_index_coder(&mut index_coder)
                .attach_intra_coder(&mut intra_coder)
                .attach_writer(&mut writer);
            encoder.encode(self.frame.budget)?
        };

        fs::write(&self.stream, finish_stream(writer)?)?;
        if let Some(recon) = &self.recon {
            let mut out = BufWriter::new(File::create(recon)?);
            reference.write_frame(&mut out, self.frame.depth())?;
            out.flush()?;
        }

        println!(
            "status {} bits {} blocks {:?}",
            u8::from(report.status),
            report.bits_used,
            report.coded_blocks
        );
        Ok(())
    }
}
