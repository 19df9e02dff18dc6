// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! JPEG marker parsing and writing.
//!
//! [`SegmentReader`] walks the top-level marker segments of a JPEG byte
//! stream. The header segments this codec understands (SOS, DRI, APP0) are
//! parsed and written here; DQT/DHT live in `tables` and SOF0 in `frame`.

use super::error::{JpegError, Result};
use super::frame::FrameInfo;
use super::scan::{ScanComponent, ScanHeader};

/// JPEG marker constants.
pub const SOI: u8 = 0xD8;
pub const EOI: u8 = 0xD9;
pub const SOF0: u8 = 0xC0;
pub const DHT: u8 = 0xC4;
pub const DAC: u8 = 0xCC;
pub const RST0: u8 = 0xD0;
pub const RST7: u8 = 0xD7;
pub const SOS: u8 = 0xDA;
pub const DQT: u8 = 0xDB;
pub const DNL: u8 = 0xDC;
pub const DRI: u8 = 0xDD;
pub const APP0: u8 = 0xE0;
pub const APP15: u8 = 0xEF;
pub const COM: u8 = 0xFE;

pub fn is_rst(marker: u8) -> bool {
    (RST0..=RST7).contains(&marker)
}

/// APPn and COM segments: carried through as opaque metadata.
pub fn is_metadata(marker: u8) -> bool {
    (APP0..=APP15).contains(&marker) || marker == COM
}

/// Name of a frame or coding marker this codec refuses, if `marker` is one.
pub fn unsupported_kind(marker: u8) -> Option<&'static str> {
    let kind = match marker {
        0xC1 => "extended sequential DCT (SOF1)",
        0xC2 => "progressive DCT (SOF2)",
        0xC3 => "lossless (SOF3)",
        0xC5..=0xC7 => "hierarchical DCT (SOF5-7)",
        0xC9..=0xCB => "arithmetic coding (SOF9-11)",
        0xCD..=0xCF => "hierarchical arithmetic coding (SOF13-15)",
        DAC => "arithmetic conditioning (DAC)",
        DNL => "height defined by DNL marker",
        0xDE | 0xDF => "hierarchical progression (DHP/EXP)",
        _ => return None,
    };
    Some(kind)
}

/// A raw marker segment kept verbatim (APPn / COM).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSegment {
    /// The marker byte, without the 0xFF prefix.
    pub marker: u8,
    /// Segment body, without the marker or the 2-byte length field.
    pub data: Vec<u8>,
}

/// Cursor over the top-level marker segments of a JPEG stream.
pub struct SegmentReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SegmentReader<'a> {
    /// Start after the SOI marker, which must open the stream.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
            return Err(JpegError::MalformedStream("missing SOI marker"));
        }
        Ok(Self { data, pos: 2 })
    }

    /// Read the next marker code, skipping 0xFF fill bytes.
    ///
    /// Anything other than a marker at the cursor is malformed; running out
    /// of data means the stream was cut before EOI.
    pub fn next_marker(&mut self) -> Result<(u8, usize)> {
        let byte = *self.data.get(self.pos).ok_or(JpegError::TruncatedStream)?;
        if byte != 0xFF {
            return Err(JpegError::MalformedStream("expected a marker"));
        }
        while self.data.get(self.pos + 1) == Some(&0xFF) {
            self.pos += 1;
        }
        let offset = self.pos;
        let marker = *self.data.get(self.pos + 1).ok_or(JpegError::TruncatedStream)?;
        if marker == 0x00 {
            return Err(JpegError::MalformedStream("expected a marker"));
        }
        self.pos += 2;
        Ok((marker, offset))
    }

    /// Read the length-prefixed body of the segment whose marker was just read.
    pub fn read_body(&mut self) -> Result<&'a [u8]> {
        let len_bytes = self
            .data
            .get(self.pos..self.pos + 2)
            .ok_or(JpegError::TruncatedStream)?;
        let length = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
        if length < 2 {
            return Err(JpegError::MalformedStream("segment length below 2"));
        }
        let body = self
            .data
            .get(self.pos + 2..self.pos + length)
            .ok_or(JpegError::TruncatedStream)?;
        self.pos += length;
        Ok(body)
    }

    /// Byte offset of the cursor: right after the last marker or segment read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Resume walking at `pos`, e.g. after the entropy-coded data of a scan.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Parse an SOS header against the frame it belongs to.
///
/// Huffman table ids are range-checked here; whether those tables are
/// defined is the caller's concern.
pub fn parse_sos(data: &[u8], frame: &FrameInfo) -> Result<ScanHeader> {
    let count = usize::from(*data.first().ok_or(JpegError::MalformedStream("empty SOS"))?);
    if count == 0 || count > frame.components.len() {
        return Err(JpegError::MalformedStream("bad SOS component count"));
    }
    if data.len() != 1 + 2 * count + 3 {
        return Err(JpegError::MalformedStream("SOS length does not match components"));
    }

    let mut components: Vec<ScanComponent> = Vec::with_capacity(count);
    for sel in data[1..1 + 2 * count].chunks_exact(2) {
        let comp_idx = frame
            .component_index(sel[0])
            .ok_or(JpegError::MalformedStream("scan references undefined component"))?;
        if components.iter().any(|c| c.comp_idx == comp_idx) {
            return Err(JpegError::MalformedStream("component repeated in scan"));
        }
        let (dc_table, ac_table) = (sel[1] >> 4, sel[1] & 0x0F);
        if dc_table > 3 || ac_table > 3 {
            return Err(JpegError::MalformedStream("Huffman table id above 3"));
        }
        components.push(ScanComponent {
            comp_idx,
            dc_table,
            ac_table,
        });
    }

    let params = &data[1 + 2 * count..];
    let (ss, se, ah_al) = (params[0], params[1], params[2]);
    if ss != 0 || se != 63 || ah_al != 0 {
        return Err(JpegError::unsupported(format!(
            "scan parameters Ss={ss} Se={se} Ah/Al={ah_al:#04x}"
        )));
    }

    Ok(ScanHeader { components })
}

/// Write a complete baseline SOS header (Ss=0, Se=63, Ah=Al=0).
pub fn write_sos(out: &mut Vec<u8>, frame: &FrameInfo, scan: &ScanHeader) {
    let length = (6 + 2 * scan.components.len()) as u16;
    out.extend_from_slice(&[0xFF, SOS]);
    out.extend_from_slice(&length.to_be_bytes());
    out.push(scan.components.len() as u8);
    for sc in &scan.components {
        out.push(frame.components[sc.comp_idx].id);
        out.push((sc.dc_table << 4) | sc.ac_table);
    }
    out.extend_from_slice(&[0, 63, 0]);
}

/// Parse a DRI body: the restart interval in MCUs (0 disables restarts).
pub fn parse_dri(data: &[u8]) -> Result<u16> {
    match data {
        [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(JpegError::MalformedStream("DRI segment length is not 4")),
    }
}

pub fn write_dri(out: &mut Vec<u8>, interval: u16) {
    out.extend_from_slice(&[0xFF, DRI, 0x00, 0x04]);
    out.extend_from_slice(&interval.to_be_bytes());
}

/// Minimal JFIF 1.01 APP0: no units, 1:1 pixel aspect, no thumbnail.
pub fn write_jfif(out: &mut Vec<u8>) {
    out.extend_from_slice(&[0xFF, APP0, 0x00, 0x10]);
    out.extend_from_slice(b"JFIF\0");
    out.extend_from_slice(&[1, 1, 0, 0, 1, 0, 1, 0, 0]);
}

/// Write a length-prefixed segment verbatim.
pub fn write_segment(out: &mut Vec<u8>, segment: &MarkerSegment) -> Result<()> {
    let length = u16::try_from(segment.data.len() + 2)
        .map_err(|_| JpegError::InvalidArgument("metadata segment exceeds 65533 bytes".into()))?;
    out.extend_from_slice(&[0xFF, segment.marker]);
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&segment.data);
    Ok(())
}

/// One top-level segment found by [`list_segments`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    /// Marker code, without the 0xFF prefix.
    pub marker: u8,
    /// Offset of the marker's 0xFF byte.
    pub offset: usize,
    /// Value of the length field; 0 for standalone markers (SOI, EOI).
    pub length: u16,
}

/// Summarize the marker segments of a stream without decoding it.
///
/// Entropy-coded data after each SOS is skipped, so progressive files are
/// listed as well. The walk ends at EOI.
pub fn list_segments(data: &[u8]) -> Result<Vec<SegmentInfo>> {
    let mut reader = SegmentReader::new(data)?;
    let mut segments = vec![SegmentInfo {
        marker: SOI,
        offset: 0,
        length: 0,
    }];

    loop {
        let (marker, offset) = reader.next_marker()?;
        if marker == EOI {
            segments.push(SegmentInfo {
                marker,
                offset,
                length: 0,
            });
            return Ok(segments);
        }
        if is_rst(marker) || marker == SOI {
            return Err(JpegError::MalformedStream("unexpected standalone marker"));
        }
        let body = reader.read_body()?;
        segments.push(SegmentInfo {
            marker,
            offset,
            length: (body.len() + 2) as u16,
        });
        if marker == SOS {
            let next = skip_scan_data(data, reader.position())?;
            reader.seek(next);
        }
    }
}

/// Skip past entropy-coded data to the next marker that is not RSTn.
///
/// Returns the offset of that marker's 0xFF byte.
pub fn skip_scan_data(data: &[u8], mut pos: usize) -> Result<usize> {
    while pos < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data.get(pos + 1) {
            None => break,
            Some(0xFF) => pos += 1,
            Some(&next) if next == 0x00 || is_rst(next) => pos += 2,
            Some(_) => return Ok(pos),
        }
    }
    Err(JpegError::TruncatedStream)
}
