use std::path::PathBuf;
use std::str::FromStr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vqcodec_core::{Chroma, CodecOptions, QualityLevel, SampleRange, StrategyKind};

use crate::commands::*;
use crate::CliResult;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct CliArgs {
    /// Block size in samples
    #[arg(long, value_name = "WxH", default_value = "4x4", global = true)]
    pub block: BlockSize,

    /// How blocks are selected for the stream
    #[arg(long, value_enum, default_value_t = Strategy::Standard, global = true)]
    pub strategy: Strategy,

    /// Quality level of the constant-quality strategy, 0 (finest) to 31
    #[arg(long, value_name = "level", default_value_t = 4, global = true)]
    pub quality: u8,

    /// Distance between two offsets of the flat codebook
    #[arg(long, value_name = "step", default_value_t = 2, global = true)]
    pub step: i32,

    /// Number of offsets in the flat codebook
    #[arg(long, value_name = "count", default_value_t = 128, global = true)]
    pub levels: usize,

    /// Largest valid sample value
    #[arg(long, value_name = "value", default_value_t = 255, global = true)]
    pub max_sample: i16,

    #[command(subcommand)]
    pub command: Commands,
}

impl CliArgs {
    pub fn codec_options(&self) -> CliResult<CodecOptions> {
        Ok(CodecOptions::default()
            .with_block_size(self.block.width, self.block.height)
            .with_strategy(self.strategy.into())
            .with_quality(QualityLevel::new(self.quality))
            .with_sample_range(SampleRange::new(0, self.max_sample)?))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Encode(encode::EncodeArgs),
    Decode(decode::DecodeArgs),
}

/// Geometry and reference of the frames on both sides of the stream.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Frame width in luminance samples
    #[arg(short = 'w', long, value_name = "width", required = true)]
    pub width: usize,

    /// Frame height in luminance samples
    #[arg(short = 'H', long, value_name = "height", required = true)]
    pub height: usize,

    /// Chroma subsampling of the raw frames
    #[arg(long, value_enum, default_value_t = ChromaFormat::Yuv420)]
    pub chroma: ChromaFormat,

    /// Raw frames hold 16 bit little endian samples
    #[arg(long)]
    pub wide_samples: bool,

    /// Reference frame, a flat mid-range frame when omitted
    #[arg(short = 'r', long = "ref", value_name = "reference frame")]
    pub reference: Option<PathBuf>,

    /// Bit budget of the stream
    #[arg(short = 'b', long, value_name = "bits", required = true)]
    pub budget: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Standard,
    ConstantQuality,
    FastHistogram,
    DeferredHistogram,
    Intra,
}

impl From<Strategy> for StrategyKind {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Standard => StrategyKind::Standard,
            Strategy::ConstantQuality => StrategyKind::ConstantQuality,
            Strategy::FastHistogram => StrategyKind::FastHistogram,
            Strategy::DeferredHistogram => StrategyKind::DeferredHistogram,
            Strategy::Intra => StrategyKind::Intra,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChromaFormat {
    Yuv444,
    Yuv420,
}

impl From<ChromaFormat> for Chroma {
    fn from(format: ChromaFormat) -> Self {
        match format {
            ChromaFormat::Yuv444 => Chroma::Yuv444,
            ChromaFormat::Yuv420 => Chroma::Yuv420,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSize {
    pub width: usize,
    pub height: usize,
}

impl FromStr for BlockSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got `{}`", s))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<usize>()
                .map_err(|e| format!("invalid block size `{}`: {}", s, e))
        };
        Ok(Self {
            width: parse(width)?,
            height: parse(height)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_block_sizes() {
        assert_eq!(
            "8x4".parse::<BlockSize>(),
            Ok(BlockSize {
                width: 8,
                height: 4
            })
        );
        assert!("8".parse::<BlockSize>().is_err());
        assert!("8xa".parse::<BlockSize>().is_err());
    }

    #[test]
    fn should_parse_global_options_after_the_subcommand() {
        let args = CliArgs::try_parse_from([
            "vqcodec",
            "encode",
            "-i",
            "in.yuv",
            "-o",
            "out.vqc",
            "-w",
            "16",
            "-H",
            "8",
            "--budget",
            "1000",
            "--strategy",
            "fast-histogram",
            "--block",
            "2x2",
        ])
        .unwrap();

        assert_eq!(args.strategy, Strategy::FastHistogram);
        assert_eq!(args.block, BlockSize { width: 2, height: 2 });
        let options = args.codec_options().unwrap();
        assert_eq!(options.strategy, StrategyKind::FastHistogram);
        assert_eq!(options.block_area(), 4);
    }
}
