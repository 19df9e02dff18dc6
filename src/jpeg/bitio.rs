// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! Bit-level I/O for JPEG entropy-coded data.
//!
//! [`BitReader`] decodes and [`BitWriter`] encodes scan data. Both work
//! MSB-first and handle byte-stuffing (a literal 0xFF byte is followed by 0x00
//! in the stream).

use super::error::{JpegError, Result};

/// Bit-level reader over entropy-coded scan data.
///
/// When the reader meets a marker it stops advancing and feeds zero bits.
/// Those bits are counted; if image data ever consumes one of them the scan
/// was cut short and [`BitReader::check_overrun`] reports it.
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    /// Bit buffer. Valid bits are the low `bits_left` bits, MSB first.
    buf: u32,
    bits_left: u8,
    /// Marker code hit inside the scan; `pos` points at its 0xFF.
    marker: Option<u8>,
    /// Zero bits fed in after `marker` was hit.
    padding: u32,
}

impl<'a> BitReader<'a> {
    /// `pos` is the first byte of entropy-coded data (right after the SOS header).
    pub fn new(data: &'a [u8], pos: usize) -> Self {
        Self {
            data,
            pos,
            buf: 0,
            bits_left: 0,
            marker: None,
            padding: 0,
        }
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    /// Read `count` bits (0–16), right-aligned.
    pub fn read_bits(&mut self, count: u8) -> Result<u16> {
        let val = self.peek_bits(count)?;
        self.bits_left -= count;
        Ok(val)
    }

    /// Look at the next `count` bits (0–16) without consuming them.
    pub fn peek_bits(&mut self, count: u8) -> Result<u16> {
        debug_assert!(count <= 16);
        if count == 0 {
            return Ok(0);
        }
        while self.bits_left < count {
            self.fill_byte()?;
        }
        let val = (self.buf >> (self.bits_left - count)) & ((1u32 << count) - 1);
        Ok(val as u16)
    }

    /// Discard `count` bits that were already peeked.
    pub fn skip_bits(&mut self, count: u8) {
        debug_assert!(count <= self.bits_left);
        self.bits_left -= count;
    }

    /// Drop the partial byte still buffered.
    pub fn align_to_byte(&mut self) {
        self.bits_left = 0;
        self.buf = 0;
        self.padding = 0;
    }

    /// Fail if image data consumed zero bits fed in past a marker.
    pub fn check_overrun(&self) -> Result<()> {
        if self.padding > u32::from(self.bits_left) {
            return Err(JpegError::TruncatedStream);
        }
        Ok(())
    }

    /// Consume the restart marker `RST<expected>` at a restart boundary.
    pub fn restart(&mut self, expected: u8) -> Result<()> {
        self.check_overrun()?;
        self.align_to_byte();

        let found = match self.marker.take() {
            Some(m) => m,
            None => {
                self.skip_fill_bytes();
                if self.pos + 1 >= self.data.len() {
                    return Err(JpegError::TruncatedStream);
                }
                if self.data[self.pos] != 0xFF {
                    return Err(JpegError::MalformedStream("missing restart marker"));
                }
                self.data[self.pos + 1]
            }
        };
        if found & 0xF8 != 0xD0 {
            return Err(JpegError::MalformedStream("missing restart marker"));
        }
        if found & 0x07 != expected & 0x07 {
            return Err(JpegError::MalformedStream("restart marker out of sequence"));
        }
        self.pos += 2;
        Ok(())
    }

    /// Finish the scan: returns the offset where the next marker begins.
    pub fn finish(mut self) -> Result<usize> {
        self.check_overrun()?;
        if self.marker.is_none() {
            self.skip_fill_bytes();
        }
        Ok(self.pos)
    }

    /// Current byte offset in the underlying data.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn skip_fill_bytes(&mut self) {
        while self.pos + 1 < self.data.len()
            && self.data[self.pos] == 0xFF
            && self.data[self.pos + 1] == 0xFF
        {
            self.pos += 1;
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.buf = (self.buf << 8) | u32::from(byte);
        self.bits_left += 8;
    }

    fn fill_byte(&mut self) -> Result<()> {
        if self.marker.is_some() {
            self.push_byte(0);
            self.padding += 8;
            return Ok(());
        }

        let byte = *self.data.get(self.pos).ok_or(JpegError::TruncatedStream)?;
        if byte != 0xFF {
            self.pos += 1;
            self.push_byte(byte);
            return Ok(());
        }

        self.skip_fill_bytes();
        let next = *self.data.get(self.pos + 1).ok_or(JpegError::TruncatedStream)?;
        if next == 0x00 {
            self.pos += 2;
            self.push_byte(0xFF);
        } else {
            self.marker = Some(next);
            self.push_byte(0);
            self.padding += 8;
        }
        Ok(())
    }
}

/// Bit-level writer for entropy-coded data, with 0xFF byte-stuffing.
#[derive(Default)]
pub struct BitWriter {
    output: Vec<u8>,
    acc: u32,
    bits_used: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            output: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Append the low `count` bits (0–16) of `value`, MSB first.
    pub fn write_bits(&mut self, value: u16, count: u8) {
        debug_assert!(count <= 16);
        if count == 0 {
            return;
        }
        let mask = (1u32 << count) - 1;
        self.acc = (self.acc << count) | (u32::from(value) & mask);
        self.bits_used += count;
        while self.bits_used >= 8 {
            self.bits_used -= 8;
            let byte = (self.acc >> self.bits_used) as u8;
            self.emit_byte(byte);
        }
        self.acc &= (1u32 << self.bits_used) - 1;
    }

    /// Pad the partial byte with 1-bits.
    pub fn align_to_byte(&mut self) {
        if self.bits_used > 0 {
            let pad = 8 - self.bits_used;
            self.write_bits((1u16 << pad) - 1, pad);
        }
    }

    /// Align and emit the unstuffed marker `RST<n % 8>`.
    pub fn write_restart(&mut self, n: u16) {
        self.align_to_byte();
        self.output.push(0xFF);
        self.output.push(0xD0 + (n % 8) as u8);
    }

    /// Align and return the finished byte stream.
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.output
    }

    fn emit_byte(&mut self, byte: u8) {
        self.output.push(byte);
        if byte == 0xFF {
            self.output.push(0x00);
        }
    }
}
