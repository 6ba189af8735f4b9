//! Owned Y/U/V planes and raw planar frame I/O.

use crate::error::CodecError;
use crate::grid::{DecodingGrid, EncodingGrid};
use crate::options::SampleRange;
use crate::result::Result;
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use ndarray::Array2;
use std::io::{Read, Write};

/// Chroma subsampling of a plane set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Chroma {
    /// Chroma planes have the luminance size.
    Yuv444,
    /// Chroma planes have half the luminance width and height, rounded up.
    #[default]
    Yuv420,
}

/// Bytes per sample of a raw frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleDepth {
    #[default]
    Eight,
    /// 16 bit little endian samples.
    Sixteen,
}

impl SampleDepth {
    pub fn bytes(&self) -> usize {
        match self {
            SampleDepth::Eight => 1,
            SampleDepth::Sixteen => 2,
        }
    }
}

/// Three planes in the order luminance, chroma U, chroma V. Each plane is
/// stored with shape `(height, width)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneSet {
    planes: [Array2<i16>; 3],
    chroma: Chroma,
}

impl PlaneSet {
    /// Plane set with every sample set to `value`.
    pub fn blank(width: usize, height: usize, chroma: Chroma, value: i16) -> Self {
        let (cw, ch) = chroma_size(width, height, chroma);
        Self {
            planes: [
                Array2::from_elem((height, width), value),
                Array2::from_elem((ch, cw), value),
                Array2::from_elem((ch, cw), value),
            ],
            chroma,
        }
    }

    pub fn from_planes(planes: [Array2<i16>; 3], chroma: Chroma) -> Result<Self> {
        let (height, width) = planes[0].dim();
        let (cw, ch) = chroma_size(width, height, chroma);
        for plane in &planes[1..] {
            let (got_height, got_width) = plane.dim();
            if got_width != cw || got_height != ch {
                return Err(CodecError::BufferShapeMismatch {
                    width: cw,
                    height: ch,
                    got_width,
                    got_height,
                });
            }
        }
        Ok(Self { planes, chroma })
    }

    pub fn width(&self) -> usize {
        self.planes[0].ncols()
    }

    pub fn height(&self) -> usize {
        self.planes[0].nrows()
    }

    pub fn chroma(&self) -> Chroma {
        self.chroma
    }

    pub fn plane(&self, channel: usize) -> &Array2<i16> {
        &self.planes[channel]
    }

    pub fn plane_mut(&mut self, channel: usize) -> &mut Array2<i16> {
        &mut self.planes[channel]
    }

    pub fn planes(&self) -> &[Array2<i16>; 3] {
        &self.planes
    }

    /// Size in bytes of one raw frame of this geometry.
    pub fn frame_len(width: usize, height: usize, chroma: Chroma, depth: SampleDepth) -> usize {
        let (cw, ch) = chroma_size(width, height, chroma);
        (width * height + 2 * cw * ch) * depth.bytes()
    }

    /// Reads one raw planar frame: all Y samples, then U, then V.
    pub fn read_frame<R: Read>(
        reader: &mut R,
        width: usize,
        height: usize,
        chroma: Chroma,
        depth: SampleDepth,
    ) -> Result<Self> {
        let expected = Self::frame_len(width, height, chroma, depth);
        let mut bytes = Vec::with_capacity(expected);
        reader.read_to_end(&mut bytes)?;
        if bytes.len() != expected {
            return Err(CodecError::FrameSizeMismatch {
                expected,
                got: bytes.len(),
            });
        }

        let samples: Vec<i16> = match depth {
            SampleDepth::Eight => bytes.iter().map(|&b| i16::from(b)).collect(),
            SampleDepth::Sixteen => {
                let mut wide = vec![0u16; bytes.len() / 2];
                LittleEndian::read_u16_into(&bytes, &mut wide);
                wide.into_iter()
                    .map(|s| s.min(i16::MAX as u16) as i16)
                    .collect()
            }
        };

        let (cw, ch) = chroma_size(width, height, chroma);
        let (luma, rest) = samples.split_at(width * height);
        let (u, v) = rest.split_at(cw * ch);
        let shape_error = |_| CodecError::FrameSizeMismatch {
            expected,
            got: bytes.len(),
        };

        Ok(Self {
            planes: [
                Array2::from_shape_vec((height, width), luma.to_vec()).map_err(shape_error)?,
                Array2::from_shape_vec((ch, cw), u.to_vec()).map_err(shape_error)?,
                Array2::from_shape_vec((ch, cw), v.to_vec()).map_err(shape_error)?,
            ],
            chroma,
        })
    }

    /// Writes the planes as one raw frame, saturating samples to the depth.
    pub fn write_frame<W: Write>(&self, writer: &mut W, depth: SampleDepth) -> Result<()> {
        for plane in &self.planes {
            for &sample in plane.iter() {
                match depth {
                    SampleDepth::Eight => writer.write_u8(sample.clamp(0, 255) as u8)?,
                    SampleDepth::Sixteen => {
                        writer.write_u16::<LittleEndian>(sample.max(0) as u16)?
                    }
                }
            }
        }
        Ok(())
    }

    /// Encoder grids reading `source` and reconstructing into `reference`.
    pub fn encoding_grids<'a>(
        source: &'a PlaneSet,
        reference: &'a mut PlaneSet,
        block_width: usize,
        block_height: usize,
    ) -> Result<[EncodingGrid<'a>; 3]> {
        let [sy, su, sv] = &source.planes;
        let [ry, ru, rv] = &mut reference.planes;
        Ok([
            encoding_grid(sy, ry, block_width, block_height)?,
            encoding_grid(su, ru, block_width, block_height)?,
            encoding_grid(sv, rv, block_width, block_height)?,
        ])
    }

    /// Decoder grids reconstructing into this plane set.
    pub fn decoding_grids(
        &mut self,
        block_width: usize,
        block_height: usize,
        range: SampleRange,
    ) -> Result<[DecodingGrid<'_>; 3]> {
        let [y, u, v] = &mut self.planes;
        Ok([
            decoding_grid(y, block_width, block_height, range)?,
            decoding_grid(u, block_width, block_height, range)?,
            decoding_grid(v, block_width, block_height, range)?,
        ])
    }
}

/// Chroma plane `(width, height)` for a luminance plane of `width x height`.
pub fn chroma_size(width: usize, height: usize, chroma: Chroma) -> (usize, usize) {
    match chroma {
        Chroma::Yuv444 => (width, height),
        Chroma::Yuv420 => ((width + 1) / 2, (height + 1) / 2),
    }
}

fn encoding_grid<'a>(
    source: &'a Array2<i16>,
    reference: &'a mut Array2<i16>,
    block_width: usize,
    block_height: usize,
) -> Result<EncodingGrid<'a>> {
    let (height, width) = reference.dim();
    EncodingGrid::new(
        source.view(),
        reference.view_mut(),
        width,
        height,
        block_width,
        block_height,
    )
}

fn decoding_grid(
    reference: &mut Array2<i16>,
    block_width: usize,
    block_height: usize,
    range: SampleRange,
) -> Result<DecodingGrid<'_>> {
    let (height, width) = reference.dim();
    DecodingGrid::new(
        reference.view_mut(),
        width,
        height,
        block_width,
        block_height,
        range,
    )
}
