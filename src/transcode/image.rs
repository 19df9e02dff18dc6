// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Pixel-domain image handed between decode and encode.

use crate::jpeg::error::{JpegError, Result};
use crate::jpeg::pixels::Plane;

/// Color model of a [`DecodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    /// One luma plane.
    Grayscale,
    /// R, G, B planes (coded as YCbCr).
    Rgb,
}

/// Chroma subsampling of a color JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Subsampling {
    /// 4:4:4, no subsampling.
    Yuv444,
    /// 4:2:2, chroma halved horizontally.
    Yuv422,
    /// 4:2:0, chroma halved in both directions.
    #[default]
    Yuv420,
}

impl Subsampling {
    /// Luma sampling factors `(h, v)`; chroma is always 1×1.
    pub fn factors(self) -> (u8, u8) {
        match self {
            Self::Yuv444 => (1, 1),
            Self::Yuv422 => (2, 1),
            Self::Yuv420 => (2, 2),
        }
    }

    pub fn from_factors(h: u8, v: u8) -> Result<Self> {
        match (h, v) {
            (1, 1) => Ok(Self::Yuv444),
            (2, 1) => Ok(Self::Yuv422),
            (2, 2) => Ok(Self::Yuv420),
            _ => Err(JpegError::unsupported(format!("luma sampling {h}x{v}"))),
        }
    }
}

/// Full-resolution pixel planes plus the sampling they were coded with.
///
/// Grayscale images carry one plane, RGB images three (R, G, B), all of
/// `width`×`height` samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: usize,
    height: usize,
    color_space: ColorSpace,
    planes: Vec<Plane>,
    subsampling: Subsampling,
}

impl DecodedImage {
    pub fn gray(plane: Plane) -> Self {
        Self {
            width: plane.width(),
            height: plane.height(),
            color_space: ColorSpace::Grayscale,
            planes: vec![plane],
            subsampling: Subsampling::Yuv444,
        }
    }

    /// Three same-sized R, G, B planes, to be coded with `subsampling`.
    pub fn rgb(planes: [Plane; 3], subsampling: Subsampling) -> Result<Self> {
        let (width, height) = (planes[0].width(), planes[0].height());
        if planes.iter().any(|p| p.width() != width || p.height() != height) {
            return Err(JpegError::InvalidArgument("RGB planes differ in size".into()));
        }
        Ok(Self {
            width,
            height,
            color_space: ColorSpace::Rgb,
            planes: planes.into(),
            subsampling,
        })
    }

    /// Build from packed 8-bit samples: 1 byte per pixel for grayscale,
    /// 3 (R, G, B) for color.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        color_space: ColorSpace,
        subsampling: Subsampling,
        pixels: &[u8],
    ) -> Result<Self> {
        match color_space {
            ColorSpace::Grayscale => Ok(Self::gray(Plane::from_vec(width, height, pixels.to_vec())?)),
            ColorSpace::Rgb => {
                if pixels.len() != width * height * 3 {
                    return Err(JpegError::InvalidArgument(format!(
                        "expected {} RGB bytes, got {}",
                        width * height * 3,
                        pixels.len()
                    )));
                }
                let channel = |c: usize| pixels.iter().skip(c).step_by(3).copied().collect::<Vec<u8>>();
                let planes = [
                    Plane::from_vec(width, height, channel(0))?,
                    Plane::from_vec(width, height, channel(1))?,
                    Plane::from_vec(width, height, channel(2))?,
                ];
                Self::rgb(planes, subsampling)
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Subsampling the image was decoded from and will be re-encoded with.
    /// Always `Yuv444` for grayscale.
    pub fn subsampling(&self) -> Subsampling {
        self.subsampling
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Packed samples, row-major: gray bytes or R, G, B triples.
    pub fn to_interleaved(&self) -> Vec<u8> {
        match self.color_space {
            ColorSpace::Grayscale => self.planes[0].data().to_vec(),
            ColorSpace::Rgb => {
                let [r, g, b] = [&self.planes[0], &self.planes[1], &self.planes[2]];
                r.data()
                    .iter()
                    .zip(g.data())
                    .zip(b.data())
                    .flat_map(|((&r, &g), &b)| [r, g, b])
                    .collect()
            }
        }
    }
}
