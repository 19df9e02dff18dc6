// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Interoperability with an independent JPEG implementation (the `image`
//! crate): its files are accepted as input, and our output decodes there.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};
use jpeg_reencode::{decode, reencode, reencode_with, ColorSpace, TranscodeMode, TranscodeOptions};

fn photo_like_rgb(width: u32, height: u32) -> Vec<u8> {
    let mut px = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let t = (x as f32 / width as f32 * 6.0).sin() * 40.0;
            px.push((90.0 + t + y as f32) as u8);
            px.push((x * 255 / width) as u8);
            px.push((160.0 - t) as u8);
        }
    }
    px
}

fn external_jpeg(pixels: &[u8], width: u32, height: u32, color: ExtendedColorType) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(pixels, width, height, color)
        .unwrap();
    out
}

fn external_decode(bytes: &[u8]) -> image::DynamicImage {
    image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).unwrap()
}

#[test]
fn foreign_rgb_input_is_transcoded() {
    let (w, h) = (57, 43);
    let src = external_jpeg(&photo_like_rgb(w, h), w, h, ExtendedColorType::Rgb8);

    let ours = decode(&src).unwrap();
    assert_eq!((ours.width(), ours.height()), (w as usize, h as usize));
    assert_eq!(ours.color_space(), ColorSpace::Rgb);

    let out = reencode(&src, 60).unwrap();
    let theirs = external_decode(&out).to_rgb8();
    assert_eq!(theirs.dimensions(), (w, h));
}

#[test]
fn foreign_gray_input_is_transcoded() {
    let (w, h) = (40, 24);
    let gray: Vec<u8> = (0..w * h).map(|i| (i % w * 6) as u8).collect();
    let src = external_jpeg(&gray, w, h, ExtendedColorType::L8);

    let out = reencode(&src, 75).unwrap();
    let ours = decode(&out).unwrap();
    assert_eq!(ours.color_space(), ColorSpace::Grayscale);

    let theirs = external_decode(&out).to_luma8();
    assert_eq!(theirs.dimensions(), (w, h));
    let diff: u64 = theirs
        .as_raw()
        .iter()
        .zip(ours.to_interleaved())
        .map(|(&a, b)| u64::from(a.abs_diff(b)))
        .sum();
    let mae = diff as f64 / f64::from(w * h);
    assert!(mae <= 2.0, "grayscale decoders disagree by {mae:.3}");
}

#[test]
fn coefficient_mode_output_decodes_elsewhere() {
    let (w, h) = (64, 48);
    let src = external_jpeg(&photo_like_rgb(w, h), w, h, ExtendedColorType::Rgb8);
    let opts = TranscodeOptions::new(50)
        .with_mode(TranscodeMode::Coefficient)
        .with_restart_interval(4);
    let out = reencode_with(&src, &opts).unwrap();
    assert_eq!(external_decode(&out).to_rgb8().dimensions(), (w, h));
}
