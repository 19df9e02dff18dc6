// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! YCbCr ↔ RGB conversion (BT.601 full range, as used by JFIF) and chroma
//! resampling.
//!
//! Chroma planes are upsampled by nearest-neighbour replication and
//! downsampled by averaging each `fh`×`fv` box, replicating edge samples
//! where a box runs past the image. The two are inverses on flat boxes, so
//! repeated decode/encode cycles do not drift.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::pixels::Plane;

fn clamp_u8(v: f64) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// One RGB pixel to YCbCr, unrounded.
pub fn rgb_to_ycbcr(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

/// One YCbCr pixel to RGB, rounded and clamped.
pub fn ycbcr_to_rgb(y: u8, cb: u8, cr: u8) -> [u8; 3] {
    let y = f64::from(y);
    let cb = f64::from(cb) - 128.0;
    let cr = f64::from(cr) - 128.0;
    [
        clamp_u8(y + 1.402 * cr),
        clamp_u8(y - 0.344_136 * cb - 0.714_136 * cr),
        clamp_u8(y + 1.772 * cb),
    ]
}

/// Convert full-resolution Y and subsampled Cb/Cr planes to R, G, B planes.
///
/// `fh`/`fv` are the chroma subsampling factors (1 or 2).
pub fn ycbcr_to_rgb_planes(y: &Plane, cb: &Plane, cr: &Plane, fh: usize, fv: usize) -> [Plane; 3] {
    let (width, height) = (y.width(), y.height());
    let mut r = Plane::new(width, height);
    let mut g = Plane::new(width, height);
    let mut b = Plane::new(width, height);

    let convert_row = |(row, ((r_row, g_row), b_row)): (usize, ((&mut [u8], &mut [u8]), &mut [u8]))| {
        for x in 0..width {
            let [rv, gv, bv] = ycbcr_to_rgb(
                y.get(x, row),
                cb.get_clamped(x / fh, row / fv),
                cr.get_clamped(x / fh, row / fv),
            );
            r_row[x] = rv;
            g_row[x] = gv;
            b_row[x] = bv;
        }
    };

    #[cfg(feature = "parallel")]
    r.data_mut()
        .par_chunks_mut(width)
        .zip(g.data_mut().par_chunks_mut(width))
        .zip(b.data_mut().par_chunks_mut(width))
        .enumerate()
        .for_each(convert_row);
    #[cfg(not(feature = "parallel"))]
    r.data_mut()
        .chunks_mut(width)
        .zip(g.data_mut().chunks_mut(width))
        .zip(b.data_mut().chunks_mut(width))
        .enumerate()
        .for_each(convert_row);

    [r, g, b]
}

/// Convert R, G, B planes to a full-resolution Y plane and Cb/Cr planes
/// subsampled by `fh`×`fv`.
pub fn rgb_to_ycbcr_planes(r: &Plane, g: &Plane, b: &Plane, fh: usize, fv: usize) -> [Plane; 3] {
    let (width, height) = (r.width(), r.height());
    let (cw, ch) = (width.div_ceil(fh), height.div_ceil(fv));

    let mut luma = Plane::new(width, height);
    let luma_row = |(row, out): (usize, &mut [u8])| {
        for (x, dst) in out.iter_mut().enumerate() {
            let (y, _, _) = rgb_to_ycbcr(
                f64::from(r.get(x, row)),
                f64::from(g.get(x, row)),
                f64::from(b.get(x, row)),
            );
            *dst = clamp_u8(y);
        }
    };

    let mut cb = Plane::new(cw, ch);
    let mut cr = Plane::new(cw, ch);
    let area = (fh * fv) as f64;
    let chroma_row = |(cy, (cb_row, cr_row)): (usize, (&mut [u8], &mut [u8]))| {
        for cx in 0..cw {
            let (mut sr, mut sg, mut sb) = (0.0, 0.0, 0.0);
            for dy in 0..fv {
                for dx in 0..fh {
                    let (x, y) = (cx * fh + dx, cy * fv + dy);
                    sr += f64::from(r.get_clamped(x, y));
                    sg += f64::from(g.get_clamped(x, y));
                    sb += f64::from(b.get_clamped(x, y));
                }
            }
            let (_, u, v) = rgb_to_ycbcr(sr / area, sg / area, sb / area);
            cb_row[cx] = clamp_u8(u);
            cr_row[cx] = clamp_u8(v);
        }
    };

    #[cfg(feature = "parallel")]
    {
        luma.data_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(luma_row);
        cb.data_mut()
            .par_chunks_mut(cw)
            .zip(cr.data_mut().par_chunks_mut(cw))
            .enumerate()
            .for_each(chroma_row);
    }
    #[cfg(not(feature = "parallel"))]
    {
        luma.data_mut().chunks_mut(width).enumerate().for_each(luma_row);
        cb.data_mut()
            .chunks_mut(cw)
            .zip(cr.data_mut().chunks_mut(cw))
            .enumerate()
            .for_each(chroma_row);
    }

    [luma, cb, cr]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: usize, height: usize, v: u8) -> Plane {
        Plane::from_vec(width, height, vec![v; width * height]).unwrap()
    }

    #[test]
    fn primaries_and_grays() {
        let (y, cb, cr) = rgb_to_ycbcr(255.0, 255.0, 255.0);
        assert!((y - 255.0).abs() < 1e-9);
        assert!((cb - 128.0).abs() < 1e-9 && (cr - 128.0).abs() < 1e-9);

        let (y, cb, cr) = rgb_to_ycbcr(255.0, 0.0, 0.0);
        assert_eq!(clamp_u8(y), 76);
        assert_eq!(clamp_u8(cb), 85);
        assert_eq!(clamp_u8(cr), 255);

        assert_eq!(ycbcr_to_rgb(128, 128, 128), [128, 128, 128]);
    }

    #[test]
    fn pixel_round_trip_is_close() {
        for &(r, g, b) in &[(12u8, 200u8, 90u8), (250, 250, 5), (0, 0, 255), (77, 77, 77)] {
            let (y, cb, cr) = rgb_to_ycbcr(f64::from(r), f64::from(g), f64::from(b));
            let back = ycbcr_to_rgb(clamp_u8(y), clamp_u8(cb), clamp_u8(cr));
            for (a, e) in back.iter().zip([r, g, b]) {
                assert!(a.abs_diff(e) <= 2, "{:?} vs {:?}", back, (r, g, b));
            }
        }
    }

    #[test]
    fn downsampling_averages_and_replicates_edges() {
        // 3x1 image, 2x1 boxes: second box is pixel 2 twice.
        let r = Plane::from_vec(3, 1, vec![0, 200, 50]).unwrap();
        let g = r.clone();
        let b = r.clone();
        let [y, cb, cr] = rgb_to_ycbcr_planes(&r, &g, &b, 2, 1);
        assert_eq!(y.data(), &[0, 200, 50]);
        assert_eq!((cb.width(), cb.height()), (2, 1));
        assert_eq!(cb.data(), &[128, 128]);
        assert_eq!(cr.data(), &[128, 128]);
    }

    #[test]
    fn chroma_is_replicated_on_upsampling() {
        let y = solid(4, 4, 100);
        let cb = Plane::from_vec(2, 2, vec![128, 200, 128, 128]).unwrap();
        let cr = solid(2, 2, 128);
        let [_, _, b] = ycbcr_to_rgb_planes(&y, &cb, &cr, 2, 2);
        // Only the top-right 2x2 quadrant picks up the blue shift.
        assert_eq!(b.get(0, 0), 100);
        assert_eq!(b.get(2, 0), b.get(3, 1));
        assert!(b.get(3, 1) > 200);
        assert_eq!(b.get(3, 2), 100);
    }

    #[test]
    fn resampling_is_stable_for_flat_chroma() {
        let r = solid(5, 3, 180);
        let g = solid(5, 3, 60);
        let b = solid(5, 3, 20);
        let [y, cb, cr] = rgb_to_ycbcr_planes(&r, &g, &b, 2, 2);
        let [r2, g2, b2] = ycbcr_to_rgb_planes(&y, &cb, &cr, 2, 2);
        let [y2, cb2, cr2] = rgb_to_ycbcr_planes(&r2, &g2, &b2, 2, 2);
        assert_eq!((y.data(), cb.data(), cr.data()), (y2.data(), cb2.data(), cr2.data()));
    }
}
