mod cli;
mod commands;

use clap::Parser;
use cli::{CliArgs, Commands};
use vqcodec_core::CodebookQuantizer;

pub type CliResult<T> = vqcodec_core::Result<T>;

fn main() -> CliResult<()> {
    env_logger::init();

    let args = CliArgs::parse();
    let options = args.codec_options()?;
    let quantizer = CodebookQuantizer::flat_levels(options.block_area(), args.step, args.levels)?;

    match args.command {
        Commands::Encode(encode) => encode.run(&options, &quantizer),
        Commands::Decode(decode) => decode.run(&options, &quantizer),
    }
}
