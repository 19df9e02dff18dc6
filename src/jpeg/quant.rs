// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Quality-scaled quantization tables.
//!
//! The base matrices are the example tables of ITU-T T.81 Annex K (K.1 and
//! K.2), which correspond to quality 50. Other qualities scale them with the
//! IJG formula.

use super::dct::QuantTable;
use super::error::{JpegError, Result};

/// Annex K.1 luminance table, natural order.
pub const LUMA_BASE: [u16; 64] = [
    16, 11, 10, 16,  24,  40,  51,  61,
    12, 12, 14, 19,  26,  58,  60,  55,
    14, 13, 16, 24,  40,  57,  69,  56,
    14, 17, 22, 29,  51,  87,  80,  62,
    18, 22, 37, 56,  68, 109, 103,  77,
    24, 35, 55, 64,  81, 104, 113,  92,
    49, 64, 78, 87, 103, 121, 120, 101,
    72, 92, 95, 98, 112, 100, 103,  99,
];

/// Annex K.2 chrominance table, natural order.
pub const CHROMA_BASE: [u16; 64] = [
    17, 18, 24, 47, 99, 99, 99, 99,
    18, 21, 26, 66, 99, 99, 99, 99,
    24, 26, 56, 99, 99, 99, 99, 99,
    47, 66, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
    99, 99, 99, 99, 99, 99, 99, 99,
];

/// A validated quality level in `1..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(u8);

impl Quality {
    pub fn new(quality: i32) -> Result<Self> {
        if !(1..=100).contains(&quality) {
            return Err(JpegError::InvalidArgument(format!(
                "quality must be in 1..=100, got {quality}"
            )));
        }
        Ok(Self(quality as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Percentage applied to the base tables: `5000/q` below 50, else `200 - 2q`.
    pub fn scale(self) -> u32 {
        let q = u32::from(self.0);
        if q < 50 {
            5000 / q
        } else {
            200 - 2 * q
        }
    }
}

/// Scale one base table to `quality`; entries are clamped to the 8-bit range.
pub fn scaled_table(base: &[u16; 64], quality: Quality) -> QuantTable {
    let scale = quality.scale();
    let mut natural = [0u16; 64];
    for (dst, &b) in natural.iter_mut().zip(base.iter()) {
        *dst = ((u32::from(b) * scale + 50) / 100).clamp(1, 255) as u16;
    }
    QuantTable::from_nonzero_natural(&natural)
}

/// Luma and chroma tables for `quality`.
pub fn tables_for_quality(quality: Quality) -> (QuantTable, QuantTable) {
    log::debug!("quantization scale {}% for quality {}", quality.scale(), quality.get());
    (
        scaled_table(&LUMA_BASE, quality),
        scaled_table(&CHROMA_BASE, quality),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_quality() {
        for q in [0, -5, 101, 1000] {
            assert!(matches!(Quality::new(q), Err(JpegError::InvalidArgument(_))));
        }
        assert_eq!(Quality::new(1).unwrap().get(), 1);
        assert_eq!(Quality::new(100).unwrap().get(), 100);
    }

    #[test]
    fn quality_50_is_the_base_table() {
        let qt = scaled_table(&LUMA_BASE, Quality::new(50).unwrap());
        assert_eq!(qt.natural(), LUMA_BASE);
    }

    #[test]
    fn quality_100_is_all_ones() {
        let (luma, chroma) = tables_for_quality(Quality::new(100).unwrap());
        assert!(luma.zigzag().iter().all(|&q| q == 1));
        assert!(chroma.zigzag().iter().all(|&q| q == 1));
    }

    #[test]
    fn quality_1_saturates_at_255() {
        let qt = scaled_table(&CHROMA_BASE, Quality::new(1).unwrap());
        assert!(qt.zigzag().iter().all(|&q| q == 255));
        assert!(qt.is_eight_bit());
    }

    #[test]
    fn known_scaled_entries() {
        // q=90: scale 20 → (16*20+50)/100 = 3
        let qt = scaled_table(&LUMA_BASE, Quality::new(90).unwrap());
        assert_eq!(qt.natural()[0], 3);
        // q=10: scale 500 → (16*500+50)/100 = 80
        let qt = scaled_table(&LUMA_BASE, Quality::new(10).unwrap());
        assert_eq!(qt.natural()[0], 80);
    }

    #[test]
    fn lower_quality_is_never_finer() {
        for q in 1..100 {
            let coarse = scaled_table(&LUMA_BASE, Quality::new(q).unwrap());
            let fine = scaled_table(&LUMA_BASE, Quality::new(q + 1).unwrap());
            for k in 0..64 {
                assert!(coarse.zigzag()[k] >= fine.zigzag()[k], "q={q} k={k}");
            }
        }
    }
}
