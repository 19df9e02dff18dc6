// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/phasmcore

//! JPEG scan data encoding and decoding.
//!
//! Decodes baseline entropy-coded scan data into [`DctGrid`]s (one per frame
//! component) and encodes grids back to entropy-coded bytes. Handles
//! interleaved and single-component MCU ordering, restart intervals, and DC
//! prediction.
//!
//! Encoding walks the blocks once per pass through a [`SymbolSink`]: a
//! counting pass gathers the statistics for optimized Huffman tables, and
//! the writing pass emits codes. Both see exactly the same symbols.

use super::bitio::{BitReader, BitWriter};
use super::dct::DctGrid;
use super::error::{JpegError, Result};
use super::frame::FrameInfo;
use super::huffman::{encode_value, extend_sign, HuffmanDecodeTable, HuffmanEncodeTable};
use super::tables::{HuffmanSpec, TableClass};
use super::zigzag::ZIGZAG_TO_NATURAL;

/// Component selector for one scan component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanComponent {
    /// Index into `FrameInfo::components`.
    pub comp_idx: usize,
    /// DC Huffman table id.
    pub dc_table: u8,
    /// AC Huffman table id.
    pub ac_table: u8,
}

/// The components coded by one scan, in coding order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanHeader {
    pub components: Vec<ScanComponent>,
}

impl ScanHeader {
    /// One interleaved scan over every frame component; luma uses tables 0,
    /// the other components tables 1.
    pub fn interleaved(frame: &FrameInfo) -> Self {
        let components = (0..frame.components.len())
            .map(|comp_idx| {
                let table = u8::from(comp_idx > 0);
                ScanComponent {
                    comp_idx,
                    dc_table: table,
                    ac_table: table,
                }
            })
            .collect();
        Self { components }
    }
}

/// Classification of one AC Huffman symbol (`run << 4 | size`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcSymbol {
    /// 0x00: the rest of the block is zero.
    EndOfBlock,
    /// 0xF0: sixteen zero coefficients.
    ZeroRun,
    /// `run` zeros followed by a coefficient of `size` bits.
    Coefficient { run: usize, size: u8 },
}

impl AcSymbol {
    fn classify(rs: u8) -> Result<Self> {
        let (run, size) = (rs >> 4, rs & 0x0F);
        match (run, size) {
            (0, 0) => Ok(Self::EndOfBlock),
            (15, 0) => Ok(Self::ZeroRun),
            (_, 1..=10) => Ok(Self::Coefficient {
                run: usize::from(run),
                size,
            }),
            _ => Err(JpegError::InvalidCode),
        }
    }
}

/// MCU layout of a scan: how many MCUs, and whether they interleave.
struct McuLayout {
    mcus_wide: usize,
    mcus_tall: usize,
    interleaved: bool,
}

impl McuLayout {
    fn new(frame: &FrameInfo, scan: &ScanHeader) -> Self {
        if scan.components.len() == 1 {
            // A single-component MCU is one block; only blocks that cover
            // image samples are coded.
            let comp_idx = scan.components[0].comp_idx;
            Self {
                mcus_wide: frame.coded_blocks_wide(comp_idx),
                mcus_tall: frame.coded_blocks_tall(comp_idx),
                interleaved: false,
            }
        } else {
            Self {
                mcus_wide: frame.mcus_wide,
                mcus_tall: frame.mcus_tall,
                interleaved: true,
            }
        }
    }

    /// Visit the blocks of one MCU as `(scan component, block row, block col)`.
    fn for_each_block(
        &self,
        frame: &FrameInfo,
        scan: &ScanHeader,
        mcu_row: usize,
        mcu_col: usize,
        mut visit: impl FnMut(usize, usize, usize) -> Result<()>,
    ) -> Result<()> {
        if !self.interleaved {
            return visit(0, mcu_row, mcu_col);
        }
        for (sci, sc) in scan.components.iter().enumerate() {
            let comp = &frame.components[sc.comp_idx];
            let (h, v) = (usize::from(comp.h_sampling), usize::from(comp.v_sampling));
            for by in 0..v {
                for bx in 0..h {
                    visit(sci, mcu_row * v + by, mcu_col * h + bx)?;
                }
            }
        }
        Ok(())
    }
}

fn restart_due(restart_interval: u16, mcu_count: usize) -> bool {
    restart_interval > 0 && mcu_count > 0 && mcu_count % usize::from(restart_interval) == 0
}

/// Build the decode tables a scan needs from the currently defined specs.
fn decode_tables(
    specs: &[Option<HuffmanSpec>; 4],
    ids: impl Iterator<Item = u8>,
) -> Result<[Option<HuffmanDecodeTable>; 4]> {
    let mut tables: [Option<HuffmanDecodeTable>; 4] = [None, None, None, None];
    for id in ids {
        let id = usize::from(id);
        if tables[id].is_none() {
            let spec = specs[id]
                .as_ref()
                .ok_or(JpegError::MalformedStream("scan references undefined Huffman table"))?;
            tables[id] = Some(HuffmanDecodeTable::new(spec)?);
        }
    }
    Ok(tables)
}

/// Decode one block into `out` (natural order), updating the DC predictor.
fn decode_block(
    reader: &mut BitReader,
    dc: &HuffmanDecodeTable,
    ac: &HuffmanDecodeTable,
    pred: &mut i32,
    out: &mut [i16],
) -> Result<()> {
    let size = dc.decode(reader)?;
    if size > 11 {
        return Err(JpegError::InvalidCode);
    }
    let diff = extend_sign(reader.read_bits(size)?, size);
    *pred = pred.saturating_add(diff);
    out[0] = (*pred).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;

    let mut k = 1;
    while k < 64 {
        match AcSymbol::classify(ac.decode(reader)?)? {
            AcSymbol::EndOfBlock => break,
            AcSymbol::ZeroRun => {
                k += 16;
                if k > 64 {
                    return Err(JpegError::InvalidCode);
                }
            }
            AcSymbol::Coefficient { run, size } => {
                k += run;
                if k > 63 {
                    return Err(JpegError::InvalidCode);
                }
                let value = extend_sign(reader.read_bits(size)?, size);
                out[ZIGZAG_TO_NATURAL[k]] = value as i16;
                k += 1;
            }
        }
    }
    Ok(())
}

/// Decode one baseline scan into `grids` (indexed by frame component).
///
/// `start` is the first byte of entropy-coded data. Blocks the scan does not
/// code keep their previous contents, so successive single-component scans
/// fill the grids in turn. Returns the offset of the marker that ends the
/// scan.
pub fn decode_scan(
    data: &[u8],
    start: usize,
    frame: &FrameInfo,
    scan: &ScanHeader,
    dc_specs: &[Option<HuffmanSpec>; 4],
    ac_specs: &[Option<HuffmanSpec>; 4],
    restart_interval: u16,
    grids: &mut [DctGrid],
) -> Result<usize> {
    let dc_tables = decode_tables(dc_specs, scan.components.iter().map(|sc| sc.dc_table))?;
    let ac_tables = decode_tables(ac_specs, scan.components.iter().map(|sc| sc.ac_table))?;
    let mut tables = Vec::with_capacity(scan.components.len());
    for sc in &scan.components {
        match (&dc_tables[usize::from(sc.dc_table)], &ac_tables[usize::from(sc.ac_table)]) {
            (Some(dc), Some(ac)) => tables.push((dc, ac)),
            _ => return Err(JpegError::MalformedStream("scan references undefined Huffman table")),
        }
    }

    let layout = McuLayout::new(frame, scan);
    log::trace!(
        "decoding scan: {} component(s), {}x{} MCUs, restart interval {}",
        scan.components.len(),
        layout.mcus_wide,
        layout.mcus_tall,
        restart_interval
    );

    let mut reader = BitReader::new(data, start);
    let mut preds = vec![0i32; scan.components.len()];
    let mut mcu_count = 0usize;
    let mut restarts = 0u8;

    for mcu_row in 0..layout.mcus_tall {
        for mcu_col in 0..layout.mcus_wide {
            if restart_due(restart_interval, mcu_count) {
                reader.restart(restarts)?;
                restarts = restarts.wrapping_add(1);
                preds.iter_mut().for_each(|p| *p = 0);
            }

            layout.for_each_block(frame, scan, mcu_row, mcu_col, |sci, br, bc| {
                let (dc, ac) = tables[sci];
                let grid = &mut grids[scan.components[sci].comp_idx];
                let block = grid.block_mut(br, bc);
                block.fill(0);
                decode_block(&mut reader, dc, ac, &mut preds[sci], block)
            })?;
            reader.check_overrun()?;
            mcu_count += 1;
        }
    }

    reader.finish()
}

/// Receiver of the symbols produced while walking a scan.
pub trait SymbolSink {
    /// One Huffman symbol of table (`class`, `table`), followed by `extra_len`
    /// raw bits taken from `extra`.
    fn symbol(
        &mut self,
        class: TableClass,
        table: u8,
        symbol: u8,
        extra: u16,
        extra_len: u8,
    ) -> Result<()>;

    /// Restart marker number `n` (counting from 0) before the next MCU.
    fn restart(&mut self, n: u16);
}

/// Walk every block of `scan` in coding order, feeding its symbols to `sink`.
pub fn emit_scan<S: SymbolSink>(
    frame: &FrameInfo,
    scan: &ScanHeader,
    grids: &[DctGrid],
    restart_interval: u16,
    sink: &mut S,
) -> Result<()> {
    let layout = McuLayout::new(frame, scan);
    let mut preds = vec![0i32; scan.components.len()];
    let mut mcu_count = 0usize;
    let mut restarts = 0u16;

    for mcu_row in 0..layout.mcus_tall {
        for mcu_col in 0..layout.mcus_wide {
            if restart_due(restart_interval, mcu_count) {
                sink.restart(restarts);
                restarts = restarts.wrapping_add(1);
                preds.iter_mut().for_each(|p| *p = 0);
            }

            layout.for_each_block(frame, scan, mcu_row, mcu_col, |sci, br, bc| {
                let sc = &scan.components[sci];
                let block = grids[sc.comp_idx].block(br, bc);
                emit_block(sink, sc, block, &mut preds[sci])
            })?;
            mcu_count += 1;
        }
    }
    Ok(())
}

fn emit_block<S: SymbolSink>(
    sink: &mut S,
    sc: &ScanComponent,
    block: &[i16],
    pred: &mut i32,
) -> Result<()> {
    let dc = i32::from(block[0]);
    let (bits, size) = encode_value(dc - *pred);
    *pred = dc;
    if size > 11 {
        return Err(JpegError::InvalidArgument(
            "DC coefficient outside the baseline range".into(),
        ));
    }
    sink.symbol(TableClass::Dc, sc.dc_table, size, bits, size)?;

    let mut run = 0u8;
    for &natural in &ZIGZAG_TO_NATURAL[1..] {
        let value = block[natural];
        if value == 0 {
            run += 1;
            continue;
        }
        while run >= 16 {
            sink.symbol(TableClass::Ac, sc.ac_table, 0xF0, 0, 0)?;
            run -= 16;
        }
        let (bits, size) = encode_value(i32::from(value));
        if size > 10 {
            return Err(JpegError::InvalidArgument(
                "AC coefficient outside the baseline range".into(),
            ));
        }
        sink.symbol(TableClass::Ac, sc.ac_table, (run << 4) | size, bits, size)?;
        run = 0;
    }
    if run > 0 {
        sink.symbol(TableClass::Ac, sc.ac_table, 0x00, 0, 0)?;
    }
    Ok(())
}

/// Symbol frequencies per Huffman table, gathered by a counting pass.
pub struct SymbolCounts {
    pub dc: [[u32; 256]; 4],
    pub ac: [[u32; 256]; 4],
}

impl Default for SymbolCounts {
    fn default() -> Self {
        Self {
            dc: [[0; 256]; 4],
            ac: [[0; 256]; 4],
        }
    }
}

impl SymbolSink for SymbolCounts {
    fn symbol(&mut self, class: TableClass, table: u8, symbol: u8, _: u16, _: u8) -> Result<()> {
        let counts = match class {
            TableClass::Dc => &mut self.dc,
            TableClass::Ac => &mut self.ac,
        };
        counts[usize::from(table)][usize::from(symbol)] += 1;
        Ok(())
    }

    fn restart(&mut self, _: u16) {}
}

/// Huffman-codes symbols into a [`BitWriter`].
struct ScanWriter {
    writer: BitWriter,
    dc: [Option<HuffmanEncodeTable>; 4],
    ac: [Option<HuffmanEncodeTable>; 4],
}

impl SymbolSink for ScanWriter {
    fn symbol(
        &mut self,
        class: TableClass,
        table: u8,
        symbol: u8,
        extra: u16,
        extra_len: u8,
    ) -> Result<()> {
        let tables = match class {
            TableClass::Dc => &self.dc,
            TableClass::Ac => &self.ac,
        };
        let enc = tables[usize::from(table)]
            .as_ref()
            .ok_or(JpegError::MalformedTable("symbol has no Huffman code"))?;
        let (code, len) = enc.encode(symbol)?;
        self.writer.write_bits(code, len);
        self.writer.write_bits(extra, extra_len);
        Ok(())
    }

    fn restart(&mut self, n: u16) {
        self.writer.write_restart(n);
    }
}

/// Count the symbols `encode_scan` would emit for these grids.
pub fn count_symbols(
    frame: &FrameInfo,
    scan: &ScanHeader,
    grids: &[DctGrid],
    restart_interval: u16,
) -> Result<SymbolCounts> {
    let mut counts = SymbolCounts::default();
    emit_scan(frame, scan, grids, restart_interval, &mut counts)?;
    Ok(counts)
}

/// Encode grids to entropy-coded bytes (no SOS header, RSTn markers
/// included when `restart_interval > 0`).
pub fn encode_scan(
    frame: &FrameInfo,
    scan: &ScanHeader,
    grids: &[DctGrid],
    dc_specs: &[Option<HuffmanSpec>; 4],
    ac_specs: &[Option<HuffmanSpec>; 4],
    restart_interval: u16,
) -> Result<Vec<u8>> {
    let build = |specs: &[Option<HuffmanSpec>; 4]| -> Result<[Option<HuffmanEncodeTable>; 4]> {
        let mut tables: [Option<HuffmanEncodeTable>; 4] = [None, None, None, None];
        for (slot, spec) in tables.iter_mut().zip(specs.iter()) {
            if let Some(spec) = spec {
                *slot = Some(HuffmanEncodeTable::new(spec)?);
            }
        }
        Ok(tables)
    };

    let blocks: usize = grids.iter().map(|g| g.blocks_wide() * g.blocks_tall()).sum();
    let mut sink = ScanWriter {
        writer: BitWriter::with_capacity(blocks * 16),
        dc: build(dc_specs)?,
        ac: build(ac_specs)?,
    };
    emit_scan(frame, scan, grids, restart_interval, &mut sink)?;
    let bytes = sink.writer.into_bytes();
    log::trace!("encoded scan: {} blocks, {} bytes", blocks, bytes.len());
    Ok(bytes)
}
