use crate::decoder::{DecoderStrategy, IntraDecoding, StandardDecoding};
use crate::encoder::{
    ConstantQuality, DeferredHistogram, EncoderStrategy, FastHistogram, IntraPrediction, Standard,
};
use crate::error::CodecError;
use crate::result::Result;
use crate::vlc::{Codeword, VlcSymbol, VlcTable};

/// Per-sample mean squared error for each quality level, from lossless-ish to coarse.
const QUALITY_MSE: [u64; QualityLevel::LEVELS] = [
    0, 1, 2, 3, 4, 6, 8, 10, 13, 16, 20, 25, 32, 40, 50, 64, 80, 100, 128, 160, 200, 256, 320,
    400, 512, 640, 800, 1024, 1280, 1600, 2048, 2560,
];

/// Inclusive range of valid sample values. Reconstructed samples are clamped to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRange {
    min: i16,
    max: i16,
}

impl SampleRange {
    pub fn new(min: i16, max: i16) -> Result<Self> {
        if min > max {
            return Err(CodecError::InvalidSampleRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i16 {
        self.min
    }

    pub fn max(&self) -> i16 {
        self.max
    }

    pub fn clamp(&self, value: i32) -> i16 {
        value.clamp(i32::from(self.min), i32::from(self.max)) as i16
    }

    /// Value the intra predictor restarts from at the start of every channel.
    pub fn midpoint(&self) -> i32 {
        (i32::from(self.min) + i32::from(self.max) + 1) / 2
    }

    /// Number of distinct differentials between two samples of this range.
    pub(crate) fn span(&self) -> usize {
        (i32::from(self.max) - i32::from(self.min)) as usize
    }
}

impl Default for SampleRange {
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

/// The two reserved codes that frame the stream. Encoder and decoder must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMarkers {
    pub end_of_plane: Codeword,
    pub end_of_image: Codeword,
}

impl FrameMarkers {
    /// Marker codes of a run-length table, `None` if it lacks either marker.
    pub fn of_table(table: &VlcTable) -> Option<Self> {
        Some(Self {
            end_of_plane: table.code_of(VlcSymbol::EndOfPlane)?,
            end_of_image: table.code_of(VlcSymbol::EndOfImage)?,
        })
    }

    /// Fails unless `coder_code` yields exactly these codes for both markers.
    pub(crate) fn check(&self, coder_code: impl Fn(VlcSymbol) -> Option<Codeword>) -> Result<()> {
        let markers = [
            ("end-of-plane", VlcSymbol::EndOfPlane, self.end_of_plane),
            ("end-of-image", VlcSymbol::EndOfImage, self.end_of_image),
        ];
        for (marker, symbol, configured) in markers {
            let coder = coder_code(symbol);
            if coder != Some(configured) {
                return Err(CodecError::MarkerMismatch {
                    marker,
                    configured,
                    coder,
                });
            }
        }
        Ok(())
    }
}

impl Default for FrameMarkers {
    /// The marker codes of [`VlcTable::run_length`](crate::vlc::VlcTable::run_length).
    fn default() -> Self {
        Self {
            end_of_plane: Codeword::new(0b100, 3),
            end_of_image: Codeword::new(0b1111110, 7),
        }
    }
}

/// Which block selection the encoder runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Greedy, always codes the block with the largest gain next.
    #[default]
    Standard,
    /// Greedy, after dropping blocks that already meet the quality level.
    ConstantQuality,
    /// Energy-bucketed approximation of the greedy order.
    FastHistogram,
    /// Like `FastHistogram`, but only quantizes blocks that clear a bucket threshold.
    DeferredHistogram,
    /// Scalar mean prediction without a quantizer.
    Intra,
}

/// Quality knob of the constant quality strategy, `0..=31`. Higher levels leave
/// more distortion uncoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QualityLevel(u8);

impl QualityLevel {
    pub const LEVELS: usize = 32;

    /// Levels above 31 saturate.
    pub fn new(level: u8) -> Self {
        Self(level.min(Self::LEVELS as u8 - 1))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    /// Uncoded distortion below which a block of `block_area` samples is left alone.
    pub fn threshold(&self, block_area: usize) -> u64 {
        QUALITY_MSE[self.0 as usize] * block_area as u64
    }
}

impl Default for QualityLevel {
    fn default() -> Self {
        Self(4)
    }
}

#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Block width in samples, the same for all three channels.
    pub block_width: usize,
    /// Block height in samples.
    pub block_height: usize,
    pub sample_range: SampleRange,
    pub markers: FrameMarkers,
    pub strategy: StrategyKind,
    /// Only used by [`StrategyKind::ConstantQuality`].
    pub quality: QualityLevel,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            block_width: 4,
            block_height: 4,
            sample_range: SampleRange::default(),
            markers: FrameMarkers::default(),
            strategy: StrategyKind::default(),
            quality: QualityLevel::default(),
        }
    }
}

impl CodecOptions {
    pub fn with_block_size(mut self, width: usize, height: usize) -> Self {
        self.block_width = width;
        self.block_height = height;
        self
    }

    pub fn with_sample_range(mut self, range: SampleRange) -> Self {
        self.sample_range = range;
        self
    }

    pub fn with_markers(mut self, markers: FrameMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_quality(mut self, quality: QualityLevel) -> Self {
        self.quality = quality;
        self
    }

    pub fn block_area(&self) -> usize {
        self.block_width * self.block_height
    }

    pub fn encoder_strategy(&self) -> EncoderStrategy {
        match self.strategy {
            StrategyKind::Standard => Standard.into(),
            StrategyKind::ConstantQuality => ConstantQuality {
                threshold: self.quality.threshold(self.block_area()),
            }
            .into(),
            StrategyKind::FastHistogram => FastHistogram.into(),
            StrategyKind::DeferredHistogram => DeferredHistogram.into(),
            StrategyKind::Intra => IntraPrediction.into(),
        }
    }

    /// All quantizer based strategies share one stream layout.
    pub fn decoder_strategy(&self) -> DecoderStrategy {
        match self.strategy {
            StrategyKind::Intra => IntraDecoding.into(),
            _ => StandardDecoding.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vlc::SymbolEncoder;

    #[test]
    fn test_default_markers_match_run_length_table() {
        let table = VlcTable::run_length().unwrap();
        let markers = FrameMarkers::default();

        assert_eq!(
            table.code_of(VlcSymbol::EndOfPlane),
            Some(markers.end_of_plane)
        );
        assert_eq!(
            table.code_of(VlcSymbol::EndOfImage),
            Some(markers.end_of_image)
        );
    }

    #[test]
    fn test_markers_must_match_the_coder() {
        let table = VlcTable::run_length().unwrap();
        let coder = table.encoder();
        assert!(FrameMarkers::default()
            .check(|m| coder.marker_code(m))
            .is_ok());

        let swapped = FrameMarkers {
            end_of_plane: FrameMarkers::default().end_of_image,
            end_of_image: FrameMarkers::default().end_of_plane,
        };
        assert!(matches!(
            swapped.check(|m| coder.marker_code(m)),
            Err(CodecError::MarkerMismatch {
                marker: "end-of-plane",
                ..
            })
        ));

        let index_coder = VlcTable::index().unwrap().encoder();
        assert!(matches!(
            FrameMarkers::default().check(|m| index_coder.marker_code(m)),
            Err(CodecError::MarkerMismatch { coder: None, .. })
        ));
    }

    #[test]
    fn test_sample_range() {
        let range = SampleRange::new(0, 63).unwrap();
        assert_eq!(range.clamp(80), 63);
        assert_eq!(range.clamp(-4), 0);
        assert_eq!(range.clamp(17), 17);
        assert_eq!(range.midpoint(), 32);
        assert_eq!(SampleRange::default().midpoint(), 128);

        assert!(SampleRange::new(5, 4).is_err());
    }

    #[test]
    fn test_quality_levels_saturate() {
        assert_eq!(QualityLevel::new(200).level(), 31);
        assert_eq!(QualityLevel::new(0).threshold(16), 0);
        assert_eq!(QualityLevel::new(31).threshold(16), 2560 * 16);
        assert!(QUALITY_MSE.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_builder() {
        let options = CodecOptions::default()
            .with_block_size(8, 2)
            .with_strategy(StrategyKind::ConstantQuality)
            .with_quality(QualityLevel::new(10));

        assert_eq!(options.block_area(), 16);
        assert_eq!(options.strategy, StrategyKind::ConstantQuality);
        assert!(matches!(
            options.encoder_strategy(),
            EncoderStrategy::ConstantQuality(ConstantQuality { threshold: 320 })
        ));
        assert!(matches!(
            options.decoder_strategy(),
            DecoderStrategy::StandardDecoding(_)
        ));
    }
}
