// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! DQT (Define Quantization Table) and DHT (Define Huffman Table) segments.
//!
//! A single segment may carry several tables. Parsing validates each table
//! against the segment body; writing emits one complete segment per table.

use super::dct::QuantTable;
use super::error::{JpegError, Result};
use super::marker::{DHT, DQT};

/// Table class of a Huffman table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableClass {
    Dc = 0,
    Ac = 1,
}

/// Stored form of a Huffman table, as carried in a DHT segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanSpec {
    pub class: TableClass,
    /// Table ID (0–3).
    pub id: u8,
    /// `bits[i]` = number of codes of length `i + 1`.
    pub bits: [u8; 16],
    /// Symbols in order of increasing code length.
    pub huffval: Vec<u8>,
}

impl HuffmanSpec {
    /// Total number of symbols announced by `bits`.
    pub fn symbol_count(&self) -> usize {
        self.bits.iter().map(|&b| b as usize).sum()
    }
}

/// Parse a DQT body (after the length field) into `(table_id, table)` pairs.
pub fn parse_dqt(data: &[u8]) -> Result<Vec<(u8, QuantTable)>> {
    let mut tables = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let pq_tq = data[pos];
        pos += 1;
        let precision = pq_tq >> 4;
        let table_id = pq_tq & 0x0F;

        if table_id > 3 {
            return Err(JpegError::MalformedTable("quantization table id above 3"));
        }
        let width = match precision {
            0 => 1,
            1 => 2,
            _ => return Err(JpegError::MalformedTable("quantization precision above 16 bits")),
        };
        let body = data
            .get(pos..pos + 64 * width)
            .ok_or(JpegError::MalformedTable("DQT segment shorter than its tables"))?;

        let mut zigzag = [0u16; 64];
        for (k, slot) in zigzag.iter_mut().enumerate() {
            *slot = if width == 1 {
                u16::from(body[k])
            } else {
                u16::from_be_bytes([body[2 * k], body[2 * k + 1]])
            };
        }
        pos += 64 * width;

        tables.push((table_id, QuantTable::from_zigzag(zigzag)?));
    }

    Ok(tables)
}

/// Write a complete DQT segment (marker, length, one table).
pub fn write_dqt(out: &mut Vec<u8>, table_id: u8, qt: &QuantTable) {
    let precision = u8::from(!qt.is_eight_bit());
    let width = if precision == 0 { 64 } else { 128 };
    let length = (2 + 1 + width) as u16;

    out.extend_from_slice(&[0xFF, DQT]);
    out.extend_from_slice(&length.to_be_bytes());
    out.push((precision << 4) | (table_id & 0x0F));
    for &q in qt.zigzag() {
        if precision == 0 {
            out.push(q as u8);
        } else {
            out.extend_from_slice(&q.to_be_bytes());
        }
    }
}

/// Parse a DHT body (after the length field).
pub fn parse_dht(data: &[u8]) -> Result<Vec<HuffmanSpec>> {
    let mut specs = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let tc_th = data[pos];
        pos += 1;
        let class = match tc_th >> 4 {
            0 => TableClass::Dc,
            1 => TableClass::Ac,
            _ => return Err(JpegError::MalformedTable("Huffman table class above 1")),
        };
        let id = tc_th & 0x0F;
        if id > 3 {
            return Err(JpegError::MalformedTable("Huffman table id above 3"));
        }

        let counts = data
            .get(pos..pos + 16)
            .ok_or(JpegError::MalformedTable("DHT segment shorter than its length counts"))?;
        let mut bits = [0u8; 16];
        bits.copy_from_slice(counts);
        pos += 16;

        let total: usize = bits.iter().map(|&b| b as usize).sum();
        if total == 0 || total > 256 {
            return Err(JpegError::MalformedTable("Huffman symbol count out of range"));
        }
        let huffval = data
            .get(pos..pos + total)
            .ok_or(JpegError::MalformedTable("DHT length counts exceed the symbol list"))?
            .to_vec();
        pos += total;

        specs.push(HuffmanSpec {
            class,
            id,
            bits,
            huffval,
        });
    }

    Ok(specs)
}

/// Write a complete DHT segment (marker, length, one table).
pub fn write_dht(out: &mut Vec<u8>, spec: &HuffmanSpec) {
    let length = (2 + 1 + 16 + spec.huffval.len()) as u16;
    out.extend_from_slice(&[0xFF, DHT]);
    out.extend_from_slice(&length.to_be_bytes());
    out.push(((spec.class as u8) << 4) | (spec.id & 0x0F));
    out.extend_from_slice(&spec.bits);
    out.extend_from_slice(&spec.huffval);
}
