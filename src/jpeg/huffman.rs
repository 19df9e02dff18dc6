// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Huffman coding tables for JPEG entropy decoding and encoding.
//!
//! Tables are built from the DHT form (`bits` + `huffval`) by assigning
//! canonical codes in order of increasing length (ITU-T T.81 Annex C). This
//! module also produces that DHT form, either from symbol statistics
//! (Annex K.2) or from the example tables of Annex K.3.

use super::bitio::BitReader;
use super::error::{JpegError, Result};
use super::tables::{HuffmanSpec, TableClass};

/// How the Huffman tables of an encoded stream are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntropyCoding {
    /// Tables generated from the image's own symbol statistics.
    #[default]
    Optimized,
    /// The example tables of ITU-T T.81 Annex K.3.
    Standard,
}

/// Walk the canonical code assignment, calling `visit(code, length, index)`
/// for each symbol index in `huffval` order.
fn assign_codes(
    bits: &[u8; 16],
    symbols: usize,
    mut visit: impl FnMut(u32, u8, usize),
) -> Result<()> {
    let total: usize = bits.iter().map(|&b| b as usize).sum();
    if total > 256 {
        return Err(JpegError::MalformedTable("more than 256 Huffman symbols"));
    }
    if total != symbols {
        return Err(JpegError::MalformedTable("Huffman length counts do not match symbols"));
    }

    let mut code: u32 = 0;
    let mut index = 0;
    for length in 1..=16u8 {
        for _ in 0..bits[(length - 1) as usize] {
            if code >= 1u32 << length {
                return Err(JpegError::MalformedTable("Huffman code lengths oversubscribed"));
            }
            visit(code, length, index);
            code += 1;
            index += 1;
        }
        code <<= 1;
    }
    Ok(())
}

/// Huffman decode table with two-level lookup.
///
/// Codes up to 8 bits resolve through a direct 256-entry table. Longer codes
/// fall back to the `maxcode` / `valoffset` comparison of Annex F.2.2.3.
pub struct HuffmanDecodeTable {
    /// Indexed by the next 8 bits: (symbol, length). Length 0 means the code
    /// is longer than 8 bits.
    fast: [(u8, u8); 256],
    /// Largest code of each length, or -1 when no code has that length.
    maxcode: [i32; 17],
    /// Added to a code of the given length to get its `huffval` index.
    valoffset: [i32; 17],
    huffval: Vec<u8>,
}

impl HuffmanDecodeTable {
    pub fn new(spec: &HuffmanSpec) -> Result<Self> {
        Self::build(&spec.bits, &spec.huffval)
    }

    /// Build a decode table from counts per code length and the symbols.
    pub fn build(bits: &[u8; 16], huffval: &[u8]) -> Result<Self> {
        let mut fast = [(0u8, 0u8); 256];
        let mut maxcode = [-1i32; 17];
        let mut valoffset = [0i32; 17];
        let mut first_index = [None::<(u32, usize)>; 17];

        assign_codes(bits, huffval.len(), |code, length, index| {
            let l = length as usize;
            if first_index[l].is_none() {
                first_index[l] = Some((code, index));
            }
            maxcode[l] = code as i32;
            if length <= 8 {
                let base = (code << (8 - length)) as usize;
                let span = 1usize << (8 - length);
                for entry in &mut fast[base..base + span] {
                    *entry = (huffval[index], length);
                }
            }
        })?;

        for (l, first) in first_index.iter().enumerate() {
            if let Some((code, index)) = *first {
                valoffset[l] = index as i32 - code as i32;
            }
        }

        Ok(Self {
            fast,
            maxcode,
            valoffset,
            huffval: huffval.to_vec(),
        })
    }

    /// Decode one symbol from the bit stream.
    pub fn decode(&self, reader: &mut BitReader) -> Result<u8> {
        let peek = reader.peek_bits(16)?;

        let (symbol, length) = self.fast[(peek >> 8) as usize];
        if length > 0 {
            reader.skip_bits(length);
            return Ok(symbol);
        }

        for length in 9..=16u8 {
            let code = i32::from(peek >> (16 - length));
            if code <= self.maxcode[length as usize] {
                reader.skip_bits(length);
                let index = code + self.valoffset[length as usize];
                return self
                    .huffval
                    .get(index as usize)
                    .copied()
                    .ok_or(JpegError::InvalidCode);
            }
        }
        Err(JpegError::InvalidCode)
    }
}

/// Huffman encode table: symbol → (code, length).
pub struct HuffmanEncodeTable {
    /// Length 0 means the symbol has no code.
    table: [(u16, u8); 256],
}

impl HuffmanEncodeTable {
    pub fn new(spec: &HuffmanSpec) -> Result<Self> {
        let mut table = [(0u16, 0u8); 256];
        assign_codes(&spec.bits, spec.huffval.len(), |code, length, index| {
            table[spec.huffval[index] as usize] = (code as u16, length);
        })?;
        Ok(Self { table })
    }

    /// Code for `symbol`, or `MalformedTable` if the table has none.
    pub fn encode(&self, symbol: u8) -> Result<(u16, u8)> {
        match self.table[symbol as usize] {
            (_, 0) => Err(JpegError::MalformedTable("symbol has no Huffman code")),
            entry => Ok(entry),
        }
    }
}

/// Recover a signed value from its `size` additional bits (Table F.1).
///
/// A leading 0 bit marks a negative value: `raw - (2^size - 1)`.
pub fn extend_sign(raw: u16, size: u8) -> i32 {
    if size == 0 {
        return 0;
    }
    let raw = i32::from(raw);
    if raw < 1 << (size - 1) {
        raw - (1 << size) + 1
    } else {
        raw
    }
}

/// Magnitude category and additional bits of a signed value.
///
/// Returns `(bits, size)`; negative values are stored as the one's
/// complement of their magnitude.
pub fn encode_value(value: i32) -> (u16, u8) {
    if value == 0 {
        return (0, 0);
    }
    let size = (32 - value.unsigned_abs().leading_zeros()) as u8;
    let bits = if value > 0 { value } else { value - 1 };
    ((bits as u32 & ((1u32 << size) - 1)) as u16, size)
}

/// Deepest code K.2 can assign: one level per symbol of a degenerate tree.
const MAX_TREE_DEPTH: usize = 256;

/// Generate a length-limited Huffman table for the observed symbol counts.
///
/// Follows Annex K.2: code sizes come from repeatedly merging the two least
/// frequent entries (tracked with `codesize`/`others` chains rather than a
/// tree), then K.3 folds lengths above 16 back into range. A reserved
/// pseudo-symbol keeps the all-ones code unused.
pub fn optimal_spec(class: TableClass, id: u8, counts: &[u32; 256]) -> HuffmanSpec {
    let mut freq = [0u64; 257];
    for (f, &c) in freq.iter_mut().zip(counts.iter()) {
        *f = u64::from(c);
    }
    if freq[..256].iter().all(|&f| f == 0) {
        // An empty table is not representable in DHT.
        freq[0] = 1;
    }
    freq[256] = 1;

    let mut codesize = [0usize; 257];
    let mut others = [None::<usize>; 257];

    loop {
        // Least frequent; ties go to the larger symbol value.
        let mut c1 = None;
        let mut v = u64::MAX;
        for (i, &f) in freq.iter().enumerate() {
            if f != 0 && f <= v {
                v = f;
                c1 = Some(i);
            }
        }
        let Some(mut c1) = c1 else { break };

        let mut c2 = None;
        let mut v = u64::MAX;
        for (i, &f) in freq.iter().enumerate() {
            if f != 0 && f <= v && i != c1 {
                v = f;
                c2 = Some(i);
            }
        }
        let Some(mut c2) = c2 else { break };

        freq[c1] += freq[c2];
        freq[c2] = 0;

        codesize[c1] += 1;
        while let Some(next) = others[c1] {
            c1 = next;
            codesize[c1] += 1;
        }
        others[c1] = Some(c2);

        codesize[c2] += 1;
        while let Some(next) = others[c2] {
            c2 = next;
            codesize[c2] += 1;
        }
    }

    let mut len_counts = [0u32; MAX_TREE_DEPTH + 1];
    for &size in codesize.iter().filter(|&&s| s > 0) {
        len_counts[size] += 1;
    }

    // K.3: move pairs of over-long codes up the tree.
    for i in (17..=MAX_TREE_DEPTH).rev() {
        while len_counts[i] > 0 {
            let mut j = i - 2;
            while len_counts[j] == 0 {
                j -= 1;
            }
            len_counts[i] -= 2;
            len_counts[i - 1] += 1;
            len_counts[j + 1] += 2;
            len_counts[j] -= 1;
        }
    }

    // Drop the pseudo-symbol, which holds one of the longest codes.
    if let Some(longest) = (1..=16).rev().find(|&i| len_counts[i] > 0) {
        len_counts[longest] -= 1;
    }

    let mut bits = [0u8; 16];
    for (dst, &n) in bits.iter_mut().zip(&len_counts[1..=16]) {
        *dst = n as u8;
    }

    debug_assert!(
        len_counts[1..=16]
            .iter()
            .enumerate()
            .map(|(i, &n)| u64::from(n) << (15 - i))
            .sum::<u64>()
            < 1 << 16,
        "Huffman code lengths oversubscribed after K.3"
    );

    let mut huffval = Vec::new();
    for size in 1..=MAX_TREE_DEPTH {
        for (symbol, &s) in codesize[..256].iter().enumerate() {
            if s == size {
                huffval.push(symbol as u8);
            }
        }
    }

    debug_assert_eq!(huffval.len(), bits.iter().map(|&n| usize::from(n)).sum::<usize>());

    HuffmanSpec {
        class,
        id,
        bits,
        huffval,
    }
}

const DC_LUMA_BITS: [u8; 16] = [0, 1, 5, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0];
const DC_CHROMA_BITS: [u8; 16] = [0, 3, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0, 0];
const DC_VALUES: [u8; 12] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11];

const AC_LUMA_BITS: [u8; 16] = [0, 2, 1, 3, 3, 2, 4, 3, 5, 5, 4, 4, 0, 0, 1, 0x7D];
#[rustfmt::skip]
const AC_LUMA_VALUES: [u8; 162] = [
    0x01, 0x02, 0x03, 0x00, 0x04, 0x11, 0x05, 0x12,
    0x21, 0x31, 0x41, 0x06, 0x13, 0x51, 0x61, 0x07,
    0x22, 0x71, 0x14, 0x32, 0x81, 0x91, 0xA1, 0x08,
    0x23, 0x42, 0xB1, 0xC1, 0x15, 0x52, 0xD1, 0xF0,
    0x24, 0x33, 0x62, 0x72, 0x82, 0x09, 0x0A, 0x16,
    0x17, 0x18, 0x19, 0x1A, 0x25, 0x26, 0x27, 0x28,
    0x29, 0x2A, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39,
    0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49,
    0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58, 0x59,
    0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68, 0x69,
    0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78, 0x79,
    0x7A, 0x83, 0x84, 0x85, 0x86, 0x87, 0x88, 0x89,
    0x8A, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5, 0xA6, 0xA7,
    0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4, 0xB5, 0xB6,
    0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3, 0xC4, 0xC5,
    0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2, 0xD3, 0xD4,
    0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA, 0xE1, 0xE2,
    0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9, 0xEA,
    0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

const AC_CHROMA_BITS: [u8; 16] = [0, 2, 1, 2, 4, 4, 3, 4, 7, 5, 4, 4, 0, 1, 2, 0x77];
#[rustfmt::skip]
const AC_CHROMA_VALUES: [u8; 162] = [
    0x00, 0x01, 0x02, 0x03, 0x11, 0x04, 0x05, 0x21,
    0x31, 0x06, 0x12, 0x41, 0x51, 0x07, 0x61, 0x71,
    0x13, 0x22, 0x32, 0x81, 0x08, 0x14, 0x42, 0x91,
    0xA1, 0xB1, 0xC1, 0x09, 0x23, 0x33, 0x52, 0xF0,
    0x15, 0x62, 0x72, 0xD1, 0x0A, 0x16, 0x24, 0x34,
    0xE1, 0x25, 0xF1, 0x17, 0x18, 0x19, 0x1A, 0x26,
    0x27, 0x28, 0x29, 0x2A, 0x35, 0x36, 0x37, 0x38,
    0x39, 0x3A, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48,
    0x49, 0x4A, 0x53, 0x54, 0x55, 0x56, 0x57, 0x58,
    0x59, 0x5A, 0x63, 0x64, 0x65, 0x66, 0x67, 0x68,
    0x69, 0x6A, 0x73, 0x74, 0x75, 0x76, 0x77, 0x78,
    0x79, 0x7A, 0x82, 0x83, 0x84, 0x85, 0x86, 0x87,
    0x88, 0x89, 0x8A, 0x92, 0x93, 0x94, 0x95, 0x96,
    0x97, 0x98, 0x99, 0x9A, 0xA2, 0xA3, 0xA4, 0xA5,
    0xA6, 0xA7, 0xA8, 0xA9, 0xAA, 0xB2, 0xB3, 0xB4,
    0xB5, 0xB6, 0xB7, 0xB8, 0xB9, 0xBA, 0xC2, 0xC3,
    0xC4, 0xC5, 0xC6, 0xC7, 0xC8, 0xC9, 0xCA, 0xD2,
    0xD3, 0xD4, 0xD5, 0xD6, 0xD7, 0xD8, 0xD9, 0xDA,
    0xE2, 0xE3, 0xE4, 0xE5, 0xE6, 0xE7, 0xE8, 0xE9,
    0xEA, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8,
    0xF9, 0xFA,
];

/// Annex K.3 example table for `class`, luminance (id 0) or chrominance (id 1).
pub fn standard_spec(class: TableClass, chroma: bool) -> HuffmanSpec {
    let (bits, huffval): (&[u8; 16], &[u8]) = match (class, chroma) {
        (TableClass::Dc, false) => (&DC_LUMA_BITS, &DC_VALUES),
        (TableClass::Dc, true) => (&DC_CHROMA_BITS, &DC_VALUES),
        (TableClass::Ac, false) => (&AC_LUMA_BITS, &AC_LUMA_VALUES),
        (TableClass::Ac, true) => (&AC_CHROMA_BITS, &AC_CHROMA_VALUES),
    };
    HuffmanSpec {
        class,
        id: u8::from(chroma),
        bits: *bits,
        huffval: huffval.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg::bitio::BitWriter;

    fn decode_all(spec: &HuffmanSpec, symbols: &[u8]) -> Vec<u8> {
        let enc = HuffmanEncodeTable::new(spec).unwrap();
        let mut w = BitWriter::new();
        for &s in symbols {
            let (code, len) = enc.encode(s).unwrap();
            w.write_bits(code, len);
        }
        let mut bytes = w.into_bytes();
        bytes.extend_from_slice(&[0xFF, 0xD9]);

        let dec = HuffmanDecodeTable::new(spec).unwrap();
        let mut r = BitReader::new(&bytes, 0);
        let out = symbols.iter().map(|_| dec.decode(&mut r).unwrap()).collect();
        r.check_overrun().unwrap();
        out
    }

    #[test]
    fn standard_tables_are_complete() {
        for class in [TableClass::Dc, TableClass::Ac] {
            for chroma in [false, true] {
                let spec = standard_spec(class, chroma);
                assert_eq!(spec.symbol_count(), spec.huffval.len());
                HuffmanDecodeTable::new(&spec).unwrap();
            }
        }
    }

    #[test]
    fn standard_luma_dc_codes() {
        let enc = HuffmanEncodeTable::new(&standard_spec(TableClass::Dc, false)).unwrap();
        assert_eq!(enc.encode(0).unwrap(), (0b00, 2));
        assert_eq!(enc.encode(1).unwrap(), (0b010, 3));
        assert_eq!(enc.encode(11).unwrap(), (0b1_1111_1110, 9));
    }

    #[test]
    fn long_codes_decode_through_slow_path() {
        let spec = standard_spec(TableClass::Ac, false);
        // 0xFA has the last 16-bit code; 0x00 (EOB) the 4-bit 1010.
        let symbols = [0xFA, 0x00, 0x01, 0xF0, 0xC9, 0x11];
        assert_eq!(decode_all(&spec, &symbols), symbols);
    }

    #[test]
    fn unmatched_code_is_invalid() {
        // Only codes 0 and 10 exist; 11... matches nothing.
        let mut bits = [0u8; 16];
        bits[0] = 1;
        bits[1] = 1;
        let dec = HuffmanDecodeTable::build(&bits, &[5, 6]).unwrap();
        let data = [0xFF, 0x00, 0xFF, 0x00];
        let mut r = BitReader::new(&data, 0);
        assert_eq!(dec.decode(&mut r), Err(JpegError::InvalidCode));
    }

    #[test]
    fn oversubscribed_lengths_rejected() {
        let mut bits = [0u8; 16];
        bits[0] = 3; // three 1-bit codes
        assert_eq!(
            HuffmanDecodeTable::build(&bits, &[1, 2, 3]).err(),
            Some(JpegError::MalformedTable("Huffman code lengths oversubscribed"))
        );
    }

    #[test]
    fn count_mismatch_rejected() {
        let mut bits = [0u8; 16];
        bits[2] = 2;
        assert!(matches!(
            HuffmanDecodeTable::build(&bits, &[1]),
            Err(JpegError::MalformedTable(_))
        ));
    }

    #[test]
    fn missing_symbol_has_no_code() {
        let enc = HuffmanEncodeTable::new(&standard_spec(TableClass::Dc, false)).unwrap();
        assert_eq!(
            enc.encode(12),
            Err(JpegError::MalformedTable("symbol has no Huffman code"))
        );
    }

    #[test]
    fn extend_sign_values() {
        assert_eq!(extend_sign(0, 1), -1);
        assert_eq!(extend_sign(1, 1), 1);
        assert_eq!(extend_sign(0, 3), -7);
        assert_eq!(extend_sign(3, 3), -4);
        assert_eq!(extend_sign(4, 3), 4);
        assert_eq!(extend_sign(0, 11), -2047);
        assert_eq!(extend_sign(0, 0), 0);
    }

    #[test]
    fn encode_value_inverts_extend_sign() {
        for v in -2047..=2047 {
            let (bits, size) = encode_value(v);
            assert_eq!(extend_sign(bits, size), v, "value {v}");
        }
        assert_eq!(encode_value(-1), (0, 1));
        assert_eq!(encode_value(1023), (1023, 10));
    }

    #[test]
    fn optimal_table_favours_frequent_symbols() {
        let mut counts = [0u32; 256];
        counts[0x00] = 1000;
        counts[0x01] = 300;
        counts[0x11] = 40;
        counts[0xF0] = 2;
        let spec = optimal_spec(TableClass::Ac, 0, &counts);
        assert_eq!(spec.huffval.len(), 4);
        assert_eq!(spec.huffval[0], 0x00);

        let enc = HuffmanEncodeTable::new(&spec).unwrap();
        let (_, eob_len) = enc.encode(0x00).unwrap();
        let (_, zrl_len) = enc.encode(0xF0).unwrap();
        assert!(eob_len < zrl_len);
        assert_eq!(decode_all(&spec, &[0xF0, 0x00, 0x11, 0x01]), [0xF0, 0x00, 0x11, 0x01]);
    }

    #[test]
    fn optimal_table_never_uses_all_ones_code() {
        let mut counts = [0u32; 256];
        counts[3] = 10;
        counts[4] = 10;
        let spec = optimal_spec(TableClass::Dc, 1, &counts);
        let enc = HuffmanEncodeTable::new(&spec).unwrap();
        for sym in [3u8, 4] {
            let (code, len) = enc.encode(sym).unwrap();
            assert_ne!(u32::from(code), (1u32 << len) - 1);
        }
    }

    #[test]
    fn optimal_table_limits_code_length() {
        // Fibonacci counts force a degenerate tree deeper than 16.
        let mut counts = [0u32; 256];
        let (mut a, mut b) = (1u32, 1u32);
        for c in counts.iter_mut().take(30) {
            *c = a;
            (a, b) = (b, a.saturating_add(b));
        }
        let spec = optimal_spec(TableClass::Ac, 0, &counts);
        assert_eq!(spec.symbol_count(), 30);
        let enc = HuffmanEncodeTable::new(&spec).unwrap();
        for sym in 0..30u8 {
            let (_, len) = enc.encode(sym).unwrap();
            assert!((1..=16).contains(&len));
        }
        HuffmanDecodeTable::new(&spec).unwrap();
    }

    #[test]
    fn optimal_table_keeps_symbols_deeper_than_32() {
        // 45 Fibonacci counts build a chain about 45 levels deep.
        let mut counts = [0u32; 256];
        let (mut a, mut b) = (1u32, 1u32);
        for c in counts.iter_mut().skip(100).take(45) {
            *c = a;
            (a, b) = (b, a + b);
        }
        let spec = optimal_spec(TableClass::Ac, 0, &counts);
        assert_eq!(spec.symbol_count(), 45);
        assert_eq!(spec.huffval.len(), 45);
        let enc = HuffmanEncodeTable::new(&spec).unwrap();
        for sym in 100..145u8 {
            let (_, len) = enc.encode(sym).unwrap();
            assert!((1..=16).contains(&len), "symbol {sym} has length {len}");
        }
        assert_eq!(decode_all(&spec, &[100, 144, 120]), [100, 144, 120]);
    }

    #[test]
    fn optimal_table_for_empty_counts() {
        let spec = optimal_spec(TableClass::Ac, 1, &[0u32; 256]);
        assert_eq!(spec.huffval, vec![0]);
        assert_eq!(spec.bits[0], 1);
    }
}
