//! Vector quantizers used to code block residuals.

use crate::error::CodecError;
use crate::result::Result;

/// Maps a residual vector to a codebook index and back.
pub trait VectorQuantizer {
    /// Number of samples per vector.
    fn dimension(&self) -> usize;

    /// Number of entries of the active codebook.
    fn codebook_length(&self) -> usize;

    /// Nearest codebook entry for `vector` and the squared error it leaves.
    fn quantize(&self, vector: &[i32]) -> (u32, u64);

    /// Codebook entry `index`, `None` if out of range.
    fn inverse_quantize(&self, index: u32) -> Option<&[i32]>;

    /// Switches to codebook `id`. Quantizers with a single codebook return `false`.
    fn select_codebook(&mut self, _id: usize) -> bool {
        false
    }
}

/// Exhaustive nearest neighbour search over one codebook.
#[derive(Debug, Clone)]
pub struct CodebookQuantizer {
    dimension: usize,
    entries: Vec<i32>,
}

impl CodebookQuantizer {
    pub fn new(dimension: usize, codebook: Vec<Vec<i32>>) -> Result<Self> {
        if dimension == 0 {
            return Err(CodecError::InvalidCodebook(
                "vector dimension must be positive".to_string(),
            ));
        }
        if codebook.is_empty() {
            return Err(CodecError::InvalidCodebook("codebook is empty".to_string()));
        }
        if codebook.len() > u32::MAX as usize {
            return Err(CodecError::InvalidCodebook(format!(
                "{} entries do not fit a 32 bit index",
                codebook.len()
            )));
        }

        let mut entries = Vec::with_capacity(dimension * codebook.len());
        for (i, entry) in codebook.into_iter().enumerate() {
            if entry.len() != dimension {
                return Err(CodecError::InvalidCodebook(format!(
                    "entry {} has {} samples, expected {}",
                    i,
                    entry.len(),
                    dimension
                )));
            }
            entries.extend(entry);
        }

        Ok(Self { dimension, entries })
    }

    /// Codebook of flat (DC only) vectors with offsets `+step, -step, +2step, -2step, ...`,
    /// `levels` entries in total.
    ///
    /// ```
    /// use vqcodec_core::{CodebookQuantizer, VectorQuantizer};
    ///
    /// let quantizer = CodebookQuantizer::flat_levels(4, 3, 4).unwrap();
    /// assert_eq!(quantizer.inverse_quantize(0), Some(&[3, 3, 3, 3][..]));
    /// assert_eq!(quantizer.inverse_quantize(3), Some(&[-6, -6, -6, -6][..]));
    /// assert_eq!(quantizer.quantize(&[5, 6, 7, 6]), (2, 2));
    /// ```
    pub fn flat_levels(dimension: usize, step: i32, levels: usize) -> Result<Self> {
        if step <= 0 {
            return Err(CodecError::InvalidCodebook(format!(
                "step must be positive, got {}",
                step
            )));
        }

        let codebook = (0..levels)
            .map(|i| {
                let magnitude = (i / 2 + 1) as i32 * step;
                let offset = if i % 2 == 0 { magnitude } else { -magnitude };
                vec![offset; dimension]
            })
            .collect();

        Self::new(dimension, codebook)
    }

    fn entry(&self, index: usize) -> &[i32] {
        &self.entries[index * self.dimension..(index + 1) * self.dimension]
    }
}

impl VectorQuantizer for CodebookQuantizer {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn codebook_length(&self) -> usize {
        self.entries.len() / self.dimension
    }

    fn quantize(&self, vector: &[i32]) -> (u32, u64) {
        let mut best = (0u32, u64::MAX);
        for (index, entry) in self.entries.chunks_exact(self.dimension).enumerate() {
            let distortion = squared_error(vector, entry);
            // strictly smaller, so the first of equal entries wins
            if distortion < best.1 {
                best = (index as u32, distortion);
            }
        }
        best
    }

    fn inverse_quantize(&self, index: u32) -> Option<&[i32]> {
        let index = index as usize;
        (index < self.codebook_length()).then(|| self.entry(index))
    }
}

/// Several codebooks of the same dimension, one of which is active.
#[derive(Debug, Clone)]
pub struct MultiCodebookQuantizer {
    codebooks: Vec<CodebookQuantizer>,
    active: usize,
}

impl MultiCodebookQuantizer {
    pub fn new(codebooks: Vec<CodebookQuantizer>) -> Result<Self> {
        let Some(first) = codebooks.first() else {
            return Err(CodecError::InvalidCodebook(
                "no codebooks given".to_string(),
            ));
        };
        let dimension = first.dimension();
        if let Some(other) = codebooks.iter().find(|c| c.dimension() != dimension) {
            return Err(CodecError::InvalidCodebook(format!(
                "codebook dimensions differ: {} and {}",
                dimension,
                other.dimension()
            )));
        }

        Ok(Self {
            codebooks,
            active: 0,
        })
    }

    pub fn active(&self) -> usize {
        self.active
    }

    fn current(&self) -> &CodebookQuantizer {
        &self.codebooks[self.active]
    }
}

impl VectorQuantizer for MultiCodebookQuantizer {
    fn dimension(&self) -> usize {
        self.current().dimension()
    }

    fn codebook_length(&self) -> usize {
        self.current().codebook_length()
    }

    fn quantize(&self, vector: &[i32]) -> (u32, u64) {
        self.current().quantize(vector)
    }

    fn inverse_quantize(&self, index: u32) -> Option<&[i32]> {
        self.current().inverse_quantize(index)
    }

    fn select_codebook(&mut self, id: usize) -> bool {
        if id < self.codebooks.len() {
            self.active = id;
            true
        } else {
            false
        }
    }
}

fn squared_error(a: &[i32], b: &[i32]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = i64::from(x) - i64::from(y);
            (d * d) as u64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_levels_order() {
        let quantizer = CodebookQuantizer::flat_levels(2, 5, 5).unwrap();
        let offsets: Vec<i32> = (0..5)
            .map(|i| quantizer.inverse_quantize(i).unwrap()[0])
            .collect();

        assert_eq!(offsets, vec![5, -5, 10, -10, 15]);
        assert_eq!(quantizer.codebook_length(), 5);
        assert_eq!(quantizer.inverse_quantize(5), None);
    }

    #[test]
    fn test_quantize_picks_nearest_entry() {
        let quantizer =
            CodebookQuantizer::new(2, vec![vec![0, 0], vec![10, 0], vec![0, 10]]).unwrap();

        assert_eq!(quantizer.quantize(&[9, 1]), (1, 2));
        assert_eq!(quantizer.quantize(&[-1, 8]), (2, 5));
    }

    #[test]
    fn test_quantize_ties_go_to_first_entry() {
        let quantizer = CodebookQuantizer::new(1, vec![vec![-2], vec![2]]).unwrap();
        assert_eq!(quantizer.quantize(&[0]), (0, 4));
    }

    #[test]
    fn test_rejects_malformed_codebooks() {
        assert!(CodebookQuantizer::new(0, vec![vec![]]).is_err());
        assert!(CodebookQuantizer::new(2, vec![]).is_err());
        assert!(CodebookQuantizer::new(2, vec![vec![1, 2], vec![3]]).is_err());
        assert!(CodebookQuantizer::flat_levels(4, 0, 8).is_err());
    }

    #[test]
    fn test_select_codebook() {
        let fine = CodebookQuantizer::flat_levels(4, 1, 8).unwrap();
        let coarse = CodebookQuantizer::flat_levels(4, 8, 4).unwrap();
        let mut quantizer = MultiCodebookQuantizer::new(vec![fine, coarse]).unwrap();

        assert_eq!(quantizer.codebook_length(), 8);
        assert!(quantizer.select_codebook(1));
        assert_eq!(quantizer.active(), 1);
        assert_eq!(quantizer.codebook_length(), 4);
        assert_eq!(quantizer.inverse_quantize(0), Some(&[8, 8, 8, 8][..]));
        assert!(!quantizer.select_codebook(2));
        assert_eq!(quantizer.active(), 1);
    }

    #[test]
    fn test_single_codebook_cannot_switch() {
        let mut quantizer = CodebookQuantizer::flat_levels(4, 1, 8).unwrap();
        assert!(!quantizer.select_codebook(1));
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let a = CodebookQuantizer::flat_levels(4, 1, 8).unwrap();
        let b = CodebookQuantizer::flat_levels(16, 1, 8).unwrap();
        assert!(MultiCodebookQuantizer::new(vec![a, b]).is_err());
        assert!(MultiCodebookQuantizer::new(vec![]).is_err());
    }
}
