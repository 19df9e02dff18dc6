// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Zigzag scan order: the mapping between the 1-D coefficient sequence used
//! in DQT segments and scan data, and the natural row-major 8×8 layout.

/// `ZIGZAG_TO_NATURAL[k]` is the row-major index of the k-th zigzag position.
pub const ZIGZAG_TO_NATURAL: [usize; 64] = [
     0,  1,  8, 16,  9,  2,  3, 10,
    17, 24, 32, 25, 18, 11,  4,  5,
    12, 19, 26, 33, 40, 48, 41, 34,
    27, 20, 13,  6,  7, 14, 21, 28,
    35, 42, 49, 56, 57, 50, 43, 36,
    29, 22, 15, 23, 30, 37, 44, 51,
    58, 59, 52, 45, 38, 31, 39, 46,
    53, 60, 61, 54, 47, 55, 62, 63,
];

/// Reorder a block from zigzag sequence into natural row-major order.
pub fn to_natural<T: Copy + Default>(zigzag: &[T; 64]) -> [T; 64] {
    let mut natural = [T::default(); 64];
    for (k, &v) in zigzag.iter().enumerate() {
        natural[ZIGZAG_TO_NATURAL[k]] = v;
    }
    natural
}

/// Reorder a block from natural row-major order into zigzag sequence.
pub fn to_zigzag<T: Copy + Default>(natural: &[T]) -> [T; 64] {
    debug_assert_eq!(natural.len(), 64);
    let mut zigzag = [T::default(); 64];
    for (k, slot) in zigzag.iter_mut().enumerate() {
        *slot = natural[ZIGZAG_TO_NATURAL[k]];
    }
    zigzag
}
