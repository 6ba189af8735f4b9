pub mod decode;
pub mod encode;

use std::fs::File;
use std::io::BufReader;

use vqcodec_core::{PlaneSet, SampleDepth, SampleRange};

use crate::cli::FrameArgs;
use crate::CliResult;

impl FrameArgs {
    pub fn depth(&self) -> SampleDepth {
        if self.wide_samples {
            SampleDepth::Sixteen
        } else {
            SampleDepth::Eight
        }
    }

    /// The frame behind `--ref`, or a flat frame at the middle of `range`.
    pub fn load_reference(&self, range: SampleRange) -> CliResult<PlaneSet> {
        match &self.reference {
            Some(path) => {
                log::debug!("reading reference frame {}", path.display());
                self.read_frame(&mut BufReader::new(File::open(path)?))
            }
            None => Ok(PlaneSet::blank(
                self.width,
                self.height,
                self.chroma.into(),
                range.clamp(range.midpoint()),
            )),
        }
    }

    pub fn read_frame<R: std::io::Read>(&self, reader: &mut R) -> CliResult<PlaneSet> {
        PlaneSet::read_frame(
            reader,
            self.width,
            self.height,
            self.chroma.into(),
            self.depth(),
        )
    }
}
