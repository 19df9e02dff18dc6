// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Pixel-domain conversion between coefficient grids and sample planes.
//!
//! Provides the 8×8 inverse DCT (coefficients → samples) and forward DCT
//! (samples → quantized coefficients), whole-grid conversions built on them,
//! and coefficient-domain requantization. Both directions share one cosine
//! table and normalization.

use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::dct::{DctGrid, QuantTable};
use super::error::{JpegError, Result};

/// Largest quantized coefficient magnitude written to a baseline stream.
pub const MAX_COEFFICIENT: i32 = 1023;

/// `COSINE[u][x] = cos((2x + 1) * u * PI / 16)`
static COSINE: OnceLock<[[f64; 8]; 8]> = OnceLock::new();

/// C(0) = 1/sqrt(8), C(u>0) = 1/2.
const NORM: [f64; 8] = [
    std::f64::consts::FRAC_1_SQRT_2 / 2.0,
    0.5,
    0.5,
    0.5,
    0.5,
    0.5,
    0.5,
    0.5,
];

fn cosine_table() -> &'static [[f64; 8]; 8] {
    COSINE.get_or_init(|| {
        let mut table = [[0.0f64; 8]; 8];
        for (u, row) in table.iter_mut().enumerate() {
            for (x, c) in row.iter_mut().enumerate() {
                *c = ((2 * x + 1) as f64 * u as f64 * std::f64::consts::PI / 16.0).cos();
            }
        }
        table
    })
}

/// A 2-D grid of 8-bit samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Plane {
    /// A zero-filled plane.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Wrap row-major samples; `data.len()` must be `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(JpegError::InvalidArgument(format!(
                "plane of {width}x{height} needs {} samples, got {}",
                width * height,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    /// Sample at `(x, y)`, with coordinates past the edge clamped to it.
    pub fn get_clamped(&self, x: usize, y: usize) -> u8 {
        self.get(x.min(self.width - 1), y.min(self.height - 1))
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Dequantize + 8×8 IDCT → 64 samples, level-shifted, rounded and clamped.
///
/// `coeffs` holds quantized coefficients in natural order; `qt` is the
/// matching natural-order table.
pub fn idct_block(coeffs: &[i16], qt: &[u16; 64]) -> [u8; 64] {
    debug_assert_eq!(coeffs.len(), 64);
    let cos = cosine_table();

    let mut f = [0.0f64; 64];
    for (dst, (&c, &q)) in f.iter_mut().zip(coeffs.iter().zip(qt.iter())) {
        *dst = f64::from(c) * f64::from(q);
    }

    // Columns first: temp[y][col] = sum_v C(v) F[v][col] cos[v][y]
    let mut temp = [0.0f64; 64];
    for col in 0..8 {
        for y in 0..8 {
            let mut sum = 0.0;
            for v in 0..8 {
                sum += NORM[v] * f[v * 8 + col] * cos[v][y];
            }
            temp[y * 8 + col] = sum;
        }
    }

    let mut samples = [0u8; 64];
    for row in 0..8 {
        for x in 0..8 {
            let mut sum = 0.0;
            for u in 0..8 {
                sum += NORM[u] * temp[row * 8 + u] * cos[u][x];
            }
            samples[row * 8 + x] = (sum + 128.0).round().clamp(0.0, 255.0) as u8;
        }
    }
    samples
}

/// Level shift + 8×8 forward DCT + quantize → 64 coefficients, natural order.
///
/// Quantization rounds to nearest, ties away from zero, and clamps to
/// ±[`MAX_COEFFICIENT`].
pub fn fdct_block(samples: &[f64; 64], qt: &[u16; 64]) -> [i16; 64] {
    let cos = cosine_table();

    // Rows first: temp[row][u] = C(u) sum_x s[row][x] cos[u][x]
    let mut temp = [0.0f64; 64];
    for row in 0..8 {
        for u in 0..8 {
            let mut sum = 0.0;
            for x in 0..8 {
                sum += (samples[row * 8 + x] - 128.0) * cos[u][x];
            }
            temp[row * 8 + u] = NORM[u] * sum;
        }
    }

    let mut quantized = [0i16; 64];
    for col in 0..8 {
        for v in 0..8 {
            let mut sum = 0.0;
            for y in 0..8 {
                sum += temp[y * 8 + col] * cos[v][y];
            }
            let coeff = NORM[v] * sum;
            quantized[v * 8 + col] = quantize(coeff / f64::from(qt[v * 8 + col]));
        }
    }
    quantized
}

fn quantize(value: f64) -> i16 {
    let limit = f64::from(MAX_COEFFICIENT);
    value.round().clamp(-limit, limit) as i16
}

/// Rescale quantized coefficients from table `old` to table `new` without
/// leaving the frequency domain: `round(c * old / new)`.
pub fn requantize_block(block: &mut [i16], old: &[u16; 64], new: &[u16; 64]) {
    for ((c, &o), &n) in block.iter_mut().zip(old.iter()).zip(new.iter()) {
        if *c != 0 {
            *c = quantize(f64::from(*c) * f64::from(o) / f64::from(n));
        }
    }
}

/// Requantize every block of a grid.
pub fn requantize_grid(grid: &mut DctGrid, old: &QuantTable, new: &QuantTable) {
    let (old, new) = (old.natural(), new.natural());
    let process_block = |block: &mut [i16]| requantize_block(block, &old, &new);

    #[cfg(feature = "parallel")]
    grid.coeffs_mut().par_chunks_mut(64).for_each(process_block);
    #[cfg(not(feature = "parallel"))]
    grid.coeffs_mut().chunks_mut(64).for_each(process_block);
}

/// Inverse-transform a component grid into a `width`×`height` plane.
///
/// Blocks beyond the plane (MCU padding) are skipped. Each block row renders
/// into its own band of eight sample rows.
pub fn grid_to_plane(grid: &DctGrid, qt: &QuantTable, width: usize, height: usize) -> Plane {
    debug_assert!(grid.blocks_wide() * 8 >= width && grid.blocks_tall() * 8 >= height);
    let mut plane = Plane::new(width, height);
    let qt = qt.natural();
    let cols = width.div_ceil(8);

    let render = |(band, coeffs): (&mut [u8], &[i16])| {
        let rows = band.len() / width;
        for bc in 0..cols {
            let samples = idct_block(&coeffs[bc * 64..bc * 64 + 64], &qt);
            let x0 = bc * 8;
            let w = (width - x0).min(8);
            for r in 0..rows {
                band[r * width + x0..r * width + x0 + w].copy_from_slice(&samples[r * 8..r * 8 + w]);
            }
        }
    };

    let band_len = width * 8;
    let row_len = grid.blocks_wide() * 64;
    #[cfg(feature = "parallel")]
    plane
        .data
        .par_chunks_mut(band_len)
        .zip(grid.coeffs().par_chunks(row_len))
        .for_each(render);
    #[cfg(not(feature = "parallel"))]
    plane
        .data
        .chunks_mut(band_len)
        .zip(grid.coeffs().chunks(row_len))
        .for_each(render);

    plane
}

/// Forward-transform a plane into a `blocks_wide`×`blocks_tall` grid.
///
/// Blocks that extend past the plane edge are padded by replicating the
/// last row and column.
pub fn plane_to_grid(
    plane: &Plane,
    qt: &QuantTable,
    blocks_wide: usize,
    blocks_tall: usize,
) -> DctGrid {
    let mut grid = DctGrid::new(blocks_wide, blocks_tall);
    let qt = qt.natural();

    let encode_row = |(br, row): (usize, &mut [i16])| {
        for bc in 0..blocks_wide {
            let mut samples = [0.0f64; 64];
            for (i, s) in samples.iter_mut().enumerate() {
                *s = f64::from(plane.get_clamped(bc * 8 + i % 8, br * 8 + i / 8));
            }
            row[bc * 64..bc * 64 + 64].copy_from_slice(&fdct_block(&samples, &qt));
        }
    };

    let row_len = blocks_wide * 64;
    #[cfg(feature = "parallel")]
    grid.coeffs_mut()
        .par_chunks_mut(row_len)
        .enumerate()
        .for_each(encode_row);
    #[cfg(not(feature = "parallel"))]
    grid.coeffs_mut()
        .chunks_mut(row_len)
        .enumerate()
        .for_each(encode_row);

    grid
}
