// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Quantized coefficient storage and quantization tables.
//!
//! [`DctGrid`] holds one component's quantized coefficients in block-raster
//! order; [`QuantTable`] holds a 64-entry quantization matrix.

use super::error::{JpegError, Result};
use super::zigzag::{to_natural, to_zigzag};

/// Quantization table: 64 divisors stored in zigzag order.
///
/// Every entry is non-zero; constructors reject tables that are not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantTable {
    zigzag: [u16; 64],
}

impl QuantTable {
    /// Build a table from entries in zigzag order (as stored in DQT).
    pub fn from_zigzag(zigzag: [u16; 64]) -> Result<Self> {
        if zigzag.contains(&0) {
            return Err(JpegError::MalformedTable("zero quantization entry"));
        }
        Ok(Self { zigzag })
    }

    /// Build a table from entries in natural row-major order.
    pub fn from_natural(natural: &[u16; 64]) -> Result<Self> {
        Self::from_zigzag(to_zigzag(natural))
    }

    /// Build from natural-order entries the caller has already clamped to >= 1.
    pub(crate) fn from_nonzero_natural(natural: &[u16; 64]) -> Self {
        debug_assert!(!natural.contains(&0));
        Self {
            zigzag: to_zigzag(natural),
        }
    }

    /// Entries in zigzag order.
    pub fn zigzag(&self) -> &[u16; 64] {
        &self.zigzag
    }

    /// Entries in natural row-major order.
    pub fn natural(&self) -> [u16; 64] {
        to_natural(&self.zigzag)
    }

    /// True when every entry fits the 8-bit baseline DQT precision.
    pub fn is_eight_bit(&self) -> bool {
        self.zigzag.iter().all(|&q| q <= 255)
    }
}

/// Grid of quantized DCT coefficients for one image component.
///
/// Blocks are stored in block-raster order; within a block the 64
/// coefficients are in natural order (`row * 8 + col`).
#[derive(Debug, Clone, PartialEq)]
pub struct DctGrid {
    blocks_wide: usize,
    blocks_tall: usize,
    coeffs: Vec<i16>,
}

impl DctGrid {
    /// Create a zero-filled grid.
    pub fn new(blocks_wide: usize, blocks_tall: usize) -> Self {
        Self {
            blocks_wide,
            blocks_tall,
            coeffs: vec![0i16; blocks_wide * blocks_tall * 64],
        }
    }

    pub fn blocks_wide(&self) -> usize {
        self.blocks_wide
    }

    pub fn blocks_tall(&self) -> usize {
        self.blocks_tall
    }

    pub fn block(&self, br: usize, bc: usize) -> &[i16] {
        let start = self.block_start(br, bc);
        &self.coeffs[start..start + 64]
    }

    pub fn block_mut(&mut self, br: usize, bc: usize) -> &mut [i16] {
        let start = self.block_start(br, bc);
        &mut self.coeffs[start..start + 64]
    }

    /// All coefficients, `blocks_tall * blocks_wide * 64` values.
    ///
    /// A chunk of `blocks_wide * 64` values is one block row; the parallel
    /// transform splits on that boundary.
    pub fn coeffs(&self) -> &[i16] {
        &self.coeffs
    }

    pub fn coeffs_mut(&mut self) -> &mut [i16] {
        &mut self.coeffs
    }

    fn block_start(&self, br: usize, bc: usize) -> usize {
        debug_assert!(br < self.blocks_tall, "block row {br} >= {}", self.blocks_tall);
        debug_assert!(bc < self.blocks_wide, "block col {bc} >= {}", self.blocks_wide);
        (br * self.blocks_wide + bc) * 64
    }
}
