// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! JPEG frame header (SOF0) parsing and writing.
//!
//! Extracts image dimensions, component information and sampling factors
//! from the Start of Frame segment, and derives the MCU geometry used by the
//! scan and transform code.

use super::error::{JpegError, Result};
use super::marker::SOF0;

/// Information about one image component from SOF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Component ID (typically 1=Y, 2=Cb, 3=Cr).
    pub id: u8,
    /// Horizontal sampling factor.
    pub h_sampling: u8,
    /// Vertical sampling factor.
    pub v_sampling: u8,
    /// Quantization table ID (0–3).
    pub quant_table_id: u8,
}

/// Frame information parsed from an SOF0 segment.
///
/// Only the layouts this codec reconstructs are accepted: one component, or
/// three components with 1×1 chroma and 1×1, 2×1 or 2×2 luma (4:4:4, 4:2:2,
/// 4:2:0). A single component is always treated as 1×1, whatever its
/// declared factors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub height: u16,
    pub width: u16,
    pub components: Vec<Component>,
    pub max_h_sampling: u8,
    pub max_v_sampling: u8,
    /// Number of MCUs horizontally in an interleaved scan.
    pub mcus_wide: usize,
    /// Number of MCUs vertically in an interleaved scan.
    pub mcus_tall: usize,
}

impl FrameInfo {
    /// Validate the component layout and derive the MCU geometry.
    pub fn new(width: u16, height: u16, mut components: Vec<Component>) -> Result<Self> {
        if height == 0 {
            return Err(JpegError::unsupported("height defined by DNL marker"));
        }
        if width == 0 {
            return Err(JpegError::unsupported("zero image width"));
        }

        match components.len() {
            1 => {
                components[0].h_sampling = 1;
                components[0].v_sampling = 1;
            }
            3 => {
                let luma = (components[0].h_sampling, components[0].v_sampling);
                let chroma_ok = components[1..]
                    .iter()
                    .all(|c| c.h_sampling == 1 && c.v_sampling == 1);
                if !chroma_ok || !matches!(luma, (1, 1) | (2, 1) | (2, 2)) {
                    return Err(JpegError::unsupported(format!(
                        "sampling {}x{},{}x{},{}x{}",
                        components[0].h_sampling,
                        components[0].v_sampling,
                        components[1].h_sampling,
                        components[1].v_sampling,
                        components[2].h_sampling,
                        components[2].v_sampling
                    )));
                }
            }
            n => return Err(JpegError::unsupported(format!("{n} color components"))),
        }

        for (i, comp) in components.iter().enumerate() {
            if comp.quant_table_id > 3 {
                return Err(JpegError::MalformedStream("quantization table id above 3"));
            }
            if components[..i].iter().any(|c| c.id == comp.id) {
                return Err(JpegError::MalformedStream("duplicate component id"));
            }
        }

        let max_h = components.iter().map(|c| c.h_sampling).max().unwrap_or(1);
        let max_v = components.iter().map(|c| c.v_sampling).max().unwrap_or(1);
        let mcu_w = usize::from(max_h) * 8;
        let mcu_h = usize::from(max_v) * 8;

        Ok(Self {
            height,
            width,
            components,
            max_h_sampling: max_h,
            max_v_sampling: max_v,
            mcus_wide: usize::from(width).div_ceil(mcu_w),
            mcus_tall: usize::from(height).div_ceil(mcu_h),
        })
    }

    pub fn is_grayscale(&self) -> bool {
        self.components.len() == 1
    }

    /// Position of the component with SOF id `id`.
    pub fn component_index(&self, id: u8) -> Option<usize> {
        self.components.iter().position(|c| c.id == id)
    }

    /// 8×8 blocks per row of a component's coefficient grid (MCU-padded).
    pub fn blocks_wide(&self, comp_idx: usize) -> usize {
        self.mcus_wide * usize::from(self.components[comp_idx].h_sampling)
    }

    /// 8×8 block rows of a component's coefficient grid (MCU-padded).
    pub fn blocks_tall(&self, comp_idx: usize) -> usize {
        self.mcus_tall * usize::from(self.components[comp_idx].v_sampling)
    }

    /// Width in samples of a component's plane.
    pub fn sample_width(&self, comp_idx: usize) -> usize {
        let h = usize::from(self.components[comp_idx].h_sampling);
        (usize::from(self.width) * h).div_ceil(usize::from(self.max_h_sampling))
    }

    /// Height in samples of a component's plane.
    pub fn sample_height(&self, comp_idx: usize) -> usize {
        let v = usize::from(self.components[comp_idx].v_sampling);
        (usize::from(self.height) * v).div_ceil(usize::from(self.max_v_sampling))
    }

    /// Blocks actually coded per row in a single-component scan.
    pub fn coded_blocks_wide(&self, comp_idx: usize) -> usize {
        self.sample_width(comp_idx).div_ceil(8)
    }

    /// Block rows actually coded in a single-component scan.
    pub fn coded_blocks_tall(&self, comp_idx: usize) -> usize {
        self.sample_height(comp_idx).div_ceil(8)
    }
}

/// Parse an SOF0 segment body (after the 2-byte length).
pub fn parse_sof(data: &[u8]) -> Result<FrameInfo> {
    if data.len() < 6 {
        return Err(JpegError::MalformedStream("SOF segment too short"));
    }
    let precision = data[0];
    if precision != 8 {
        return Err(JpegError::unsupported(format!("{precision}-bit sample precision")));
    }

    let height = u16::from_be_bytes([data[1], data[2]]);
    let width = u16::from_be_bytes([data[3], data[4]]);
    let count = data[5] as usize;
    if data.len() != 6 + count * 3 {
        return Err(JpegError::MalformedStream("SOF segment length does not match components"));
    }

    let components = data[6..]
        .chunks_exact(3)
        .map(|c| Component {
            id: c[0],
            h_sampling: c[1] >> 4,
            v_sampling: c[1] & 0x0F,
            quant_table_id: c[2],
        })
        .collect();

    let frame = FrameInfo::new(width, height, components)?;
    log::debug!(
        "SOF0 {}x{}, {} component(s), sampling {}x{}",
        frame.width,
        frame.height,
        frame.components.len(),
        frame.max_h_sampling,
        frame.max_v_sampling
    );
    Ok(frame)
}

/// Write a complete SOF0 segment.
pub fn write_sof(out: &mut Vec<u8>, frame: &FrameInfo) {
    let length = (8 + 3 * frame.components.len()) as u16;
    out.extend_from_slice(&[0xFF, SOF0]);
    out.extend_from_slice(&length.to_be_bytes());
    out.push(8);
    out.extend_from_slice(&frame.height.to_be_bytes());
    out.extend_from_slice(&frame.width.to_be_bytes());
    out.push(frame.components.len() as u8);
    for comp in &frame.components {
        out.push(comp.id);
        out.push((comp.h_sampling << 4) | comp.v_sampling);
        out.push(comp.quant_table_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ycbcr_420() {
        let data = [
            8, 1, 0xE0, 2, 0x80, 3, // precision, height=480, width=640, 3 comps
            1, 0x22, 0, // Y: 2x2, qt=0
            2, 0x11, 1, // Cb: 1x1, qt=1
            3, 0x11, 1, // Cr: 1x1, qt=1
        ];

        let fi = parse_sof(&data).unwrap();
        assert_eq!((fi.width, fi.height), (640, 480));
        assert_eq!(fi.components.len(), 3);
        assert_eq!((fi.max_h_sampling, fi.max_v_sampling), (2, 2));
        assert_eq!((fi.mcus_wide, fi.mcus_tall), (40, 30));
        assert_eq!((fi.blocks_wide(0), fi.blocks_tall(0)), (80, 60));
        assert_eq!((fi.blocks_wide(1), fi.blocks_tall(1)), (40, 30));
        assert_eq!((fi.sample_width(1), fi.sample_height(1)), (320, 240));
    }

    #[test]
    fn odd_sizes_round_up() {
        // 4:2:2, 17x9: chroma plane is 9x9, coded as 2x2 blocks,
        // grid padded to whole MCUs (2 MCUs of 16x8 wide, 2 tall).
        let comps = vec![
            Component { id: 1, h_sampling: 2, v_sampling: 1, quant_table_id: 0 },
            Component { id: 2, h_sampling: 1, v_sampling: 1, quant_table_id: 1 },
            Component { id: 3, h_sampling: 1, v_sampling: 1, quant_table_id: 1 },
        ];
        let fi = FrameInfo::new(17, 9, comps).unwrap();
        assert_eq!((fi.mcus_wide, fi.mcus_tall), (2, 2));
        assert_eq!((fi.sample_width(1), fi.sample_height(1)), (9, 9));
        assert_eq!((fi.coded_blocks_wide(1), fi.coded_blocks_tall(1)), (2, 2));
        assert_eq!((fi.coded_blocks_wide(0), fi.coded_blocks_tall(0)), (3, 2));
        assert_eq!(fi.blocks_wide(0), 4);
    }

    #[test]
    fn grayscale_is_normalized_to_1x1() {
        let data = [8, 0, 10, 0, 10, 1, 1, 0x22, 0];
        let fi = parse_sof(&data).unwrap();
        assert!(fi.is_grayscale());
        assert_eq!(fi.components[0].h_sampling, 1);
        assert_eq!((fi.mcus_wide, fi.mcus_tall), (2, 2));
    }

    #[test]
    fn reject_12bit() {
        let data = [12, 0, 8, 0, 8, 1, 1, 0x11, 0];
        assert!(matches!(parse_sof(&data), Err(JpegError::UnsupportedFormat(_))));
    }

    #[test]
    fn reject_dnl_height() {
        let data = [8, 0, 0, 0, 8, 1, 1, 0x11, 0];
        assert!(matches!(parse_sof(&data), Err(JpegError::UnsupportedFormat(_))));
    }

    #[test]
    fn reject_unusual_sampling() {
        // 4:1:1
        let data = [8, 0, 8, 0, 8, 3, 1, 0x41, 0, 2, 0x11, 1, 3, 0x11, 1];
        assert!(matches!(parse_sof(&data), Err(JpegError::UnsupportedFormat(_))));
        // subsampled luma with 2x2 chroma
        let data = [8, 0, 8, 0, 8, 3, 1, 0x22, 0, 2, 0x22, 1, 3, 0x11, 1];
        assert!(matches!(parse_sof(&data), Err(JpegError::UnsupportedFormat(_))));
        // CMYK
        let data = [8, 0, 8, 0, 8, 4, 1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0, 4, 0x11, 0];
        assert!(matches!(parse_sof(&data), Err(JpegError::UnsupportedFormat(_))));
    }

    #[test]
    fn reject_length_mismatch_and_duplicates() {
        let data = [8, 0, 8, 0, 8, 3, 1, 0x11, 0];
        assert!(matches!(parse_sof(&data), Err(JpegError::MalformedStream(_))));
        let data = [8, 0, 8, 0, 8, 3, 1, 0x11, 0, 1, 0x11, 1, 3, 0x11, 1];
        assert_eq!(
            parse_sof(&data),
            Err(JpegError::MalformedStream("duplicate component id"))
        );
    }

    #[test]
    fn written_sof_parses_back() {
        let data = [8, 0, 20, 0, 30, 3, 1, 0x21, 0, 2, 0x11, 1, 3, 0x11, 1];
        let fi = parse_sof(&data).unwrap();
        let mut seg = Vec::new();
        write_sof(&mut seg, &fi);
        assert_eq!(&seg[..4], &[0xFF, SOF0, 0, 17]);
        assert_eq!(&seg[4..], &data);
    }
}
