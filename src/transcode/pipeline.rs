// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Decode / encode / re-encode pipeline.
//!
//! Pixel mode: parse → Huffman decode → dequantize + IDCT → upsample and
//! convert to RGB → convert back and downsample at the original factors →
//! FDCT + quantize with the new tables → Huffman encode.
//!
//! Coefficient mode skips the pixel stages and rescales each quantized
//! coefficient from the source table to the target table.

use crate::jpeg::color::{rgb_to_ycbcr_planes, ycbcr_to_rgb_planes};
use crate::jpeg::dct::QuantTable;
use crate::jpeg::error::{JpegError, Result};
use crate::jpeg::frame::{Component, FrameInfo};
use crate::jpeg::marker::MarkerSegment;
use crate::jpeg::pixels::{grid_to_plane, plane_to_grid, Plane};
use crate::jpeg::quant::{tables_for_quality, Quality};
use crate::jpeg::JpegImage;

use super::image::{ColorSpace, DecodedImage, Subsampling};
use super::options::{EntropyCoding, MetadataPolicy, TranscodeMode, TranscodeOptions};

/// Decode a baseline JPEG to full-resolution pixel planes.
///
/// # Errors
/// Any parse or entropy-decoding error of [`JpegImage::from_bytes`].
pub fn decode(bytes: &[u8]) -> Result<DecodedImage> {
    let img = JpegImage::from_bytes(bytes)?;
    decode_image(&img)
}

/// Encode pixel planes as a baseline JFIF stream at `quality` (1–100),
/// with optimized Huffman tables and the image's own subsampling.
///
/// # Errors
/// [`JpegError::InvalidArgument`] for a quality outside 1–100 or an image
/// larger than 65535 pixels on a side.
pub fn encode(image: &DecodedImage, quality: i32) -> Result<Vec<u8>> {
    let quality = Quality::new(quality)?;
    encode_image(image, quality, EntropyCoding::Optimized, 0, Vec::new())
}

/// Re-encode a baseline JPEG at `quality` with default options.
///
/// Same as `reencode_with(bytes, &TranscodeOptions::new(quality))`.
pub fn reencode(bytes: &[u8], quality: i32) -> Result<Vec<u8>> {
    reencode_with(bytes, &TranscodeOptions::new(quality))
}

/// Re-encode a baseline JPEG with full control over the output.
///
/// The quality is validated before the input is parsed. Output is
/// deterministic: the same bytes and options always produce the same stream.
pub fn reencode_with(bytes: &[u8], options: &TranscodeOptions) -> Result<Vec<u8>> {
    let quality = Quality::new(options.quality)?;
    let mut img = JpegImage::from_bytes(bytes)?;

    let restart_interval = options.restart_interval.unwrap_or(img.restart_interval());
    if options.metadata == MetadataPolicy::Strip {
        img.clear_metadata();
    }
    log::debug!(
        "re-encoding {}x{} {}-component JPEG at quality {} ({:?} mode)",
        img.frame_info().width,
        img.frame_info().height,
        img.num_components(),
        quality.get(),
        options.mode
    );

    match options.mode {
        TranscodeMode::Pixel => {
            let decoded = decode_image(&img)?;
            let metadata = img.metadata().to_vec();
            encode_image(&decoded, quality, options.entropy, restart_interval, metadata)
        }
        TranscodeMode::Coefficient => {
            let (luma, chroma) = tables_for_quality(quality);
            img.requantize(&luma, &chroma)?;
            img.set_restart_interval(restart_interval);
            img.to_bytes(options.entropy)
        }
    }
}

/// Inverse path for an already-parsed image.
fn decode_image(img: &JpegImage) -> Result<DecodedImage> {
    let frame = img.frame_info();
    let mut planes = Vec::with_capacity(img.num_components());
    for i in 0..img.num_components() {
        planes.push(grid_to_plane(
            img.dct_grid(i),
            img.component_quant_table(i)?,
            frame.sample_width(i),
            frame.sample_height(i),
        ));
    }

    let mut planes = planes.into_iter();
    match (planes.next(), planes.next(), planes.next()) {
        (Some(y), None, None) => Ok(DecodedImage::gray(y)),
        (Some(y), Some(cb), Some(cr)) => {
            let (fh, fv) = (frame.max_h_sampling, frame.max_v_sampling);
            let subsampling = Subsampling::from_factors(fh, fv)?;
            let rgb = ycbcr_to_rgb_planes(&y, &cb, &cr, usize::from(fh), usize::from(fv));
            DecodedImage::rgb(rgb, subsampling)
        }
        _ => Err(JpegError::unsupported(format!("{} color components", img.num_components()))),
    }
}

/// Forward path: color conversion, FDCT at the new tables, stream assembly.
fn encode_image(
    image: &DecodedImage,
    quality: Quality,
    entropy: EntropyCoding,
    restart_interval: u16,
    metadata: Vec<MarkerSegment>,
) -> Result<Vec<u8>> {
    let too_large =
        || JpegError::InvalidArgument(format!("{}x{} exceeds 65535 pixels", image.width(), image.height()));
    let width = u16::try_from(image.width()).map_err(|_| too_large())?;
    let height = u16::try_from(image.height()).map_err(|_| too_large())?;

    let (luma, chroma) = tables_for_quality(quality);
    let (frame, planes, quant_tables) = match image.color_space() {
        ColorSpace::Grayscale => {
            let frame = FrameInfo::new(width, height, vec![component(1, (1, 1), 0)])?;
            let tables: [Option<QuantTable>; 4] = [Some(luma), None, None, None];
            (frame, vec![image.planes()[0].clone()], tables)
        }
        ColorSpace::Rgb => {
            let (h, v) = image.subsampling().factors();
            let frame = FrameInfo::new(
                width,
                height,
                vec![component(1, (h, v), 0), component(2, (1, 1), 1), component(3, (1, 1), 1)],
            )?;
            let [r, g, b] = [&image.planes()[0], &image.planes()[1], &image.planes()[2]];
            let ycc: [Plane; 3] = rgb_to_ycbcr_planes(r, g, b, usize::from(h), usize::from(v));
            let tables: [Option<QuantTable>; 4] = [Some(luma), Some(chroma), None, None];
            (frame, ycc.into(), tables)
        }
    };

    let mut grids = Vec::with_capacity(planes.len());
    for (i, plane) in planes.iter().enumerate() {
        let id = usize::from(frame.components[i].quant_table_id);
        let qt = quant_tables[id]
            .as_ref()
            .ok_or(JpegError::MalformedStream("undefined quantization table"))?;
        grids.push(plane_to_grid(plane, qt, frame.blocks_wide(i), frame.blocks_tall(i)));
    }

    JpegImage::from_parts(frame, grids, quant_tables, restart_interval, metadata)?.to_bytes(entropy)
}

fn component(id: u8, (h, v): (u8, u8), quant_table_id: u8) -> Component {
    Component {
        id,
        h_sampling: h,
        v_sampling: v,
        quant_table_id,
    }
}
