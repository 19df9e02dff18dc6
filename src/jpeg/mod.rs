// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Baseline JPEG coefficient codec.
//!
//! Reads baseline JPEG files into quantized DCT coefficients and writes
//! coefficients back out as a fresh JFIF stream. The pixel-domain helpers
//! (`pixels`, `color`) and the quality-scaled tables (`quant`) sit on top of
//! it and are driven by the `transcode` pipeline.
//!
//! Supports:
//! - Baseline sequential DCT (SOF0), 8-bit precision
//! - Grayscale, and YCbCr with 4:4:4, 4:2:2 or 4:2:0 sampling
//! - Interleaved and single-component scans (several scans accumulate)
//! - Restart markers (DRI/RST)
//! - Optimized or standard Huffman tables on output
//!
//! Does NOT support:
//! - Progressive, lossless, hierarchical, or arithmetic-coded frames
//! - 12-bit precision
//!
//! Anything unsupported is rejected at parse time.

pub mod error;
pub mod zigzag;
pub mod dct;
pub mod bitio;
pub mod tables;
pub mod huffman;
pub mod frame;
pub mod marker;
pub mod scan;
pub mod pixels;
pub mod color;
pub mod quant;

use dct::{DctGrid, QuantTable};
use error::{JpegError, Result};
use frame::FrameInfo;
use huffman::{optimal_spec, standard_spec, EntropyCoding};
use marker::{MarkerSegment, SegmentReader};
use scan::ScanHeader;
use tables::{HuffmanSpec, TableClass};

/// A parsed baseline JPEG: frame header, quantized coefficients and tables.
///
/// Created with [`JpegImage::from_bytes`], or assembled from freshly
/// computed grids with [`JpegImage::from_parts`]. [`JpegImage::to_bytes`]
/// always writes a single interleaved baseline scan with newly built
/// Huffman tables.
#[derive(Debug, Clone)]
pub struct JpegImage {
    frame: FrameInfo,
    /// One grid per frame component, in frame order.
    grids: Vec<DctGrid>,
    /// Quantization tables, indexed by table ID (0–3).
    quant_tables: [Option<QuantTable>; 4],
    /// Restart interval in MCUs (0 = no restarts).
    restart_interval: u16,
    /// APPn and COM segments in original order.
    metadata: Vec<MarkerSegment>,
}

impl JpegImage {
    /// Parse a baseline JPEG byte stream.
    ///
    /// Walks the marker segments in one pass, decoding each scan as its SOS
    /// is reached. Bytes after EOI are ignored.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = SegmentReader::new(data)?;

        let mut frame: Option<FrameInfo> = None;
        let mut grids: Vec<DctGrid> = Vec::new();
        let mut covered: Vec<bool> = Vec::new();
        let mut quant_tables: [Option<QuantTable>; 4] = [None, None, None, None];
        let mut dc_specs: [Option<HuffmanSpec>; 4] = [None, None, None, None];
        let mut ac_specs: [Option<HuffmanSpec>; 4] = [None, None, None, None];
        let mut restart_interval = 0u16;
        let mut metadata = Vec::new();
        let mut scans = 0usize;

        loop {
            let (code, offset) = reader.next_marker()?;
            log::trace!("marker 0x{code:02X} at offset {offset}");

            match code {
                marker::EOI => break,
                marker::SOF0 => {
                    let body = reader.read_body()?;
                    if frame.is_some() {
                        return Err(JpegError::MalformedStream("more than one SOF marker"));
                    }
                    let fi = frame::parse_sof(body)?;
                    covered = vec![false; fi.components.len()];
                    frame = Some(fi);
                }
                marker::DQT => {
                    for (id, qt) in tables::parse_dqt(reader.read_body()?)? {
                        quant_tables[usize::from(id)] = Some(qt);
                    }
                }
                marker::DHT => {
                    for spec in tables::parse_dht(reader.read_body()?)? {
                        let id = usize::from(spec.id);
                        match spec.class {
                            TableClass::Dc => dc_specs[id] = Some(spec),
                            TableClass::Ac => ac_specs[id] = Some(spec),
                        }
                    }
                }
                marker::DRI => {
                    restart_interval = marker::parse_dri(reader.read_body()?)?;
                }
                marker::SOS => {
                    let body = reader.read_body()?;
                    let fi = frame
                        .as_ref()
                        .ok_or(JpegError::MalformedStream("SOS before SOF0"))?;
                    let scan = marker::parse_sos(body, fi)?;
                    if grids.is_empty() {
                        grids = allocate_grids(fi, data.len() - reader.position())?;
                    }
                    let end = scan::decode_scan(
                        data,
                        reader.position(),
                        fi,
                        &scan,
                        &dc_specs,
                        &ac_specs,
                        restart_interval,
                        &mut grids,
                    )?;
                    log::debug!(
                        "scan {scans}: {} component(s), {} bytes of entropy data",
                        scan.components.len(),
                        end - reader.position()
                    );
                    for sc in &scan.components {
                        covered[sc.comp_idx] = true;
                    }
                    reader.seek(end);
                    scans += 1;
                }
                m if marker::is_metadata(m) => {
                    let body = reader.read_body()?;
                    metadata.push(MarkerSegment {
                        marker: m,
                        data: body.to_vec(),
                    });
                }
                m if marker::is_rst(m) => {
                    return Err(JpegError::MalformedStream("restart marker outside scan data"));
                }
                marker::SOI => return Err(JpegError::MalformedStream("SOI inside stream")),
                m => {
                    let kind = marker::unsupported_kind(m)
                        .map(str::to_owned)
                        .unwrap_or_else(|| format!("marker 0x{m:02X}"));
                    return Err(JpegError::unsupported(kind));
                }
            }
        }

        let frame = frame.ok_or(JpegError::MalformedStream("no SOF0 before EOI"))?;
        if scans == 0 {
            return Err(JpegError::MalformedStream("EOI before any scan"));
        }
        if covered.contains(&false) {
            return Err(JpegError::MalformedStream("component never coded in a scan"));
        }
        for comp in &frame.components {
            if quant_tables[usize::from(comp.quant_table_id)].is_none() {
                return Err(JpegError::MalformedStream("undefined quantization table"));
            }
        }
        if frame.components.len() == 3 && metadata.iter().any(is_rgb_adobe_segment) {
            return Err(JpegError::unsupported("RGB-coded components (Adobe transform 0)"));
        }
        if reader.position() < data.len() {
            log::debug!("ignoring {} bytes after EOI", data.len() - reader.position());
        }

        Ok(Self {
            frame,
            grids,
            quant_tables,
            restart_interval,
            metadata,
        })
    }

    /// Assemble an image from coefficient grids, one per frame component.
    ///
    /// Every component's quantization table must be present and each grid
    /// must have the component's MCU-padded block dimensions.
    pub fn from_parts(
        frame: FrameInfo,
        grids: Vec<DctGrid>,
        quant_tables: [Option<QuantTable>; 4],
        restart_interval: u16,
        metadata: Vec<MarkerSegment>,
    ) -> Result<Self> {
        if grids.len() != frame.components.len() {
            return Err(JpegError::InvalidArgument(format!(
                "{} grids for {} components",
                grids.len(),
                frame.components.len()
            )));
        }
        for (i, (comp, grid)) in frame.components.iter().zip(&grids).enumerate() {
            if quant_tables[usize::from(comp.quant_table_id)].is_none() {
                return Err(JpegError::InvalidArgument(format!(
                    "component {i} uses undefined quantization table {}",
                    comp.quant_table_id
                )));
            }
            if (grid.blocks_wide(), grid.blocks_tall()) != (frame.blocks_wide(i), frame.blocks_tall(i)) {
                return Err(JpegError::InvalidArgument(format!(
                    "grid {i} is {}x{} blocks, frame needs {}x{}",
                    grid.blocks_wide(),
                    grid.blocks_tall(),
                    frame.blocks_wide(i),
                    frame.blocks_tall(i)
                )));
            }
        }
        Ok(Self {
            frame,
            grids,
            quant_tables,
            restart_interval,
            metadata,
        })
    }

    /// Encode as a baseline JFIF stream.
    ///
    /// Segment order: SOI, APP0 (JFIF), metadata, DQT, DHT, SOF0, DRI, SOS,
    /// entropy data, EOI. Input APP0 segments are not copied; the JFIF header
    /// is always regenerated.
    pub fn to_bytes(&self, entropy: EntropyCoding) -> Result<Vec<u8>> {
        let scan = ScanHeader::interleaved(&self.frame);
        let table_ids: &[u8] = if self.frame.is_grayscale() { &[0] } else { &[0, 1] };

        let mut dc_specs: [Option<HuffmanSpec>; 4] = [None, None, None, None];
        let mut ac_specs: [Option<HuffmanSpec>; 4] = [None, None, None, None];
        match entropy {
            EntropyCoding::Optimized => {
                let counts = scan::count_symbols(&self.frame, &scan, &self.grids, self.restart_interval)?;
                for &id in table_ids {
                    let i = usize::from(id);
                    dc_specs[i] = Some(optimal_spec(TableClass::Dc, id, &counts.dc[i]));
                    ac_specs[i] = Some(optimal_spec(TableClass::Ac, id, &counts.ac[i]));
                }
            }
            EntropyCoding::Standard => {
                for &id in table_ids {
                    let i = usize::from(id);
                    dc_specs[i] = Some(standard_spec(TableClass::Dc, id == 1));
                    ac_specs[i] = Some(standard_spec(TableClass::Ac, id == 1));
                }
            }
        }

        let entropy_data = scan::encode_scan(
            &self.frame,
            &scan,
            &self.grids,
            &dc_specs,
            &ac_specs,
            self.restart_interval,
        )?;

        let mut out = Vec::with_capacity(entropy_data.len() + 1024);
        out.extend_from_slice(&[0xFF, marker::SOI]);
        marker::write_jfif(&mut out);
        for seg in self.metadata.iter().filter(|s| s.marker != marker::APP0) {
            marker::write_segment(&mut out, seg)?;
        }

        let mut written = [false; 4];
        for comp in &self.frame.components {
            let id = usize::from(comp.quant_table_id);
            if !written[id] {
                let qt = self.quant_tables[id]
                    .as_ref()
                    .ok_or(JpegError::MalformedStream("undefined quantization table"))?;
                tables::write_dqt(&mut out, comp.quant_table_id, qt);
                written[id] = true;
            }
        }

        for spec in dc_specs.iter().zip(ac_specs.iter()).flat_map(|(d, a)| [d, a]).flatten() {
            tables::write_dht(&mut out, spec);
        }
        frame::write_sof(&mut out, &self.frame);
        if self.restart_interval > 0 {
            marker::write_dri(&mut out, self.restart_interval);
        }
        marker::write_sos(&mut out, &self.frame, &scan);
        out.extend_from_slice(&entropy_data);
        out.extend_from_slice(&[0xFF, marker::EOI]);

        log::debug!(
            "encoded {}x{} JPEG: {} bytes ({} entropy-coded)",
            self.frame.width,
            self.frame.height,
            out.len(),
            entropy_data.len()
        );
        Ok(out)
    }

    /// Move every component to a new quantization table without a pixel
    /// round-trip: luma onto `luma` (table 0), other components onto
    /// `chroma` (table 1).
    pub fn requantize(&mut self, luma: &QuantTable, chroma: &QuantTable) -> Result<()> {
        for i in 0..self.frame.components.len() {
            let (new_id, new_table) = if i == 0 { (0u8, luma) } else { (1u8, chroma) };
            let old = self.component_quant_table(i)?.clone();
            pixels::requantize_grid(&mut self.grids[i], &old, new_table);
            self.frame.components[i].quant_table_id = new_id;
        }
        self.quant_tables = [Some(luma.clone()), None, None, None];
        if !self.frame.is_grayscale() {
            self.quant_tables[1] = Some(chroma.clone());
        }
        Ok(())
    }

    /// Coefficient grid of frame component `component`.
    pub fn dct_grid(&self, component: usize) -> &DctGrid {
        &self.grids[component]
    }

    pub fn frame_info(&self) -> &FrameInfo {
        &self.frame
    }

    /// Quantization table by ID.
    pub fn quant_table(&self, id: usize) -> Option<&QuantTable> {
        self.quant_tables.get(id).and_then(Option::as_ref)
    }

    /// The quantization table used by frame component `component`.
    pub fn component_quant_table(&self, component: usize) -> Result<&QuantTable> {
        let id = usize::from(self.frame.components[component].quant_table_id);
        self.quant_table(id)
            .ok_or(JpegError::MalformedStream("undefined quantization table"))
    }

    pub fn num_components(&self) -> usize {
        self.grids.len()
    }

    pub fn restart_interval(&self) -> u16 {
        self.restart_interval
    }

    pub fn set_restart_interval(&mut self, interval: u16) {
        self.restart_interval = interval;
    }

    /// APPn and COM segments carried by the image.
    pub fn metadata(&self) -> &[MarkerSegment] {
        &self.metadata
    }

    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }
}

/// An Adobe APP14 segment declaring untransformed (RGB) components.
/// Coefficient grids for `frame`, sized only once scan data is reached.
///
/// Every coded block takes at least two bits (DC code and EOB), so a frame
/// with more than four blocks per remaining byte cannot be complete.
fn allocate_grids(frame: &FrameInfo, remaining: usize) -> Result<Vec<DctGrid>> {
    let coded: usize = (0..frame.components.len())
        .map(|i| frame.coded_blocks_wide(i) * frame.coded_blocks_tall(i))
        .sum();
    if coded > remaining.saturating_mul(4) {
        return Err(JpegError::MalformedStream("frame larger than its scan data"));
    }
    Ok((0..frame.components.len())
        .map(|i| DctGrid::new(frame.blocks_wide(i), frame.blocks_tall(i)))
        .collect())
}

fn is_rgb_adobe_segment(seg: &MarkerSegment) -> bool {
    seg.marker == 0xEE && seg.data.len() >= 12 && seg.data.starts_with(b"Adobe") && seg.data[11] == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::frame::Component;

    fn gray_frame(width: u16, height: u16) -> FrameInfo {
        FrameInfo::new(
            width,
            height,
            vec![Component { id: 1, h_sampling: 1, v_sampling: 1, quant_table_id: 0 }],
        )
        .unwrap()
    }

    fn sample_image() -> JpegImage {
        let frame = gray_frame(16, 8);
        let mut grid = DctGrid::new(2, 1);
        grid.block_mut(0, 0)[0] = 40;
        grid.block_mut(0, 1)[0] = -12;
        grid.block_mut(0, 1)[9] = 3;
        let qt = QuantTable::from_zigzag([4u16; 64]).unwrap();
        JpegImage::from_parts(
            frame,
            vec![grid],
            [Some(qt), None, None, None],
            0,
            vec![MarkerSegment { marker: marker::COM, data: b"hello".to_vec() }],
        )
        .unwrap()
    }

    #[test]
    fn written_stream_parses_back() {
        let img = sample_image();
        for entropy in [EntropyCoding::Optimized, EntropyCoding::Standard] {
            let bytes = img.to_bytes(entropy).unwrap();
            assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
            assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);

            let back = JpegImage::from_bytes(&bytes).unwrap();
            assert_eq!(back.dct_grid(0), img.dct_grid(0));
            assert_eq!(back.quant_table(0), img.quant_table(0));
            let carried: Vec<_> = back.metadata().iter().filter(|s| s.marker != marker::APP0).collect();
            assert_eq!(carried, img.metadata().iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn segment_order_is_standard() {
        let mut img = sample_image();
        img.set_restart_interval(1);
        let bytes = img.to_bytes(EntropyCoding::Optimized).unwrap();
        let markers: Vec<u8> = marker::list_segments(&bytes)
            .unwrap()
            .iter()
            .map(|s| s.marker)
            .collect();
        assert_eq!(
            markers,
            [
                marker::SOI,
                marker::APP0,
                marker::COM,
                marker::DQT,
                marker::DHT,
                marker::DHT,
                marker::SOF0,
                marker::DRI,
                marker::SOS,
                marker::EOI
            ]
        );
        assert_eq!(JpegImage::from_bytes(&bytes).unwrap().restart_interval(), 1);
    }

    #[test]
    fn requantize_moves_tables() {
        let mut img = sample_image();
        let coarse = QuantTable::from_zigzag([8u16; 64]).unwrap();
        img.requantize(&coarse, &coarse).unwrap();
        assert_eq!(img.quant_table(0), Some(&coarse));
        assert_eq!(img.dct_grid(0).block(0, 0)[0], 20);
        assert_eq!(img.dct_grid(0).block(0, 1)[9], 2); // 1.5 rounds away from zero
    }

    #[test]
    fn grammar_violations() {
        let bytes = sample_image().to_bytes(EntropyCoding::Standard).unwrap();

        // Not starting with SOI.
        assert!(matches!(
            JpegImage::from_bytes(&bytes[2..]),
            Err(JpegError::MalformedStream(_))
        ));

        // SOS before SOF0: drop the SOF0 segment.
        let segs = marker::list_segments(&bytes).unwrap();
        let sof = segs.iter().find(|s| s.marker == marker::SOF0).unwrap();
        let mut no_sof = bytes[..sof.offset].to_vec();
        no_sof.extend_from_slice(&bytes[sof.offset + 2 + usize::from(sof.length)..]);
        assert_eq!(
            JpegImage::from_bytes(&no_sof).err(),
            Some(JpegError::MalformedStream("SOS before SOF0"))
        );

        // EOI straight after the headers.
        let sos = segs.iter().find(|s| s.marker == marker::SOS).unwrap();
        let mut no_scan = bytes[..sos.offset].to_vec();
        no_scan.extend_from_slice(&[0xFF, 0xD9]);
        assert_eq!(
            JpegImage::from_bytes(&no_scan).err(),
            Some(JpegError::MalformedStream("EOI before any scan"))
        );

        // Duplicate SOF0.
        let mut twice = bytes[..sos.offset].to_vec();
        twice.extend_from_slice(&bytes[sof.offset..sof.offset + 2 + usize::from(sof.length)]);
        twice.extend_from_slice(&bytes[sos.offset..]);
        assert_eq!(
            JpegImage::from_bytes(&twice).err(),
            Some(JpegError::MalformedStream("more than one SOF marker"))
        );
    }

    #[test]
    fn progressive_frame_is_unsupported() {
        let data = [
            0xFF, 0xD8, // SOI
            0xFF, 0xC2, 0x00, 0x0B, 8, 0, 8, 0, 8, 1, 1, 0x11, 0, // SOF2
            0xFF, 0xD9,
        ];
        assert_eq!(
            JpegImage::from_bytes(&data).err(),
            Some(JpegError::UnsupportedFormat("progressive DCT (SOF2)".into()))
        );
    }

    #[test]
    fn trailing_bytes_after_eoi_are_ignored() {
        let mut bytes = sample_image().to_bytes(EntropyCoding::Optimized).unwrap();
        bytes.extend_from_slice(b"trailer");
        assert!(JpegImage::from_bytes(&bytes).is_ok());
    }

    #[test]
    fn from_parts_checks_grid_shape() {
        let qt = QuantTable::from_zigzag([1u16; 64]).unwrap();
        let result = JpegImage::from_parts(
            gray_frame(16, 16),
            vec![DctGrid::new(1, 1)],
            [Some(qt), None, None, None],
            0,
            Vec::new(),
        );
        assert!(matches!(result, Err(JpegError::InvalidArgument(_))));
    }
}
