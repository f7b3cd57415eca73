/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! Parsing of whole **Z80** files into a machine-independent staging form.
use std::io::{self, Result};

use log::{debug, warn};

use crate::bus::CpuRegs;
use crate::memory::{NUM_RAM_BANKS, RAM_SIZE};
use crate::video::BorderColor;
use super::common::{Header, HEADER_SIZE, PAGE_SIZE, read_exact_from};
use super::decompress::{decompress, split_v1_terminator};

/// Where a memory page belongs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PageDest {
    /// One of the RAM banks, ordered from address `0x4000` up.
    Ram(usize),
    /// A page of a machine the 48K model does not have.
    Junk
}

/// Everything read out of a **Z80** file, staged before any of it is
/// applied to a machine.
#[derive(Debug)]
pub(crate) struct Z80Snapshot {
    pub regs: CpuRegs,
    pub border: BorderColor,
    pub pages: Vec<(PageDest, Vec<u8>)>
}

/// Parses a whole **Z80** file of any of the three versions.
///
/// Only the 48K hardware models are accepted. Nothing is borrowed from the
/// input: the returned snapshot owns all unpacked memory.
pub(crate) fn parse(data: &[u8]) -> Result<Z80Snapshot> {
    let header = Header::from_bytes(data)?;
    let mut rest = &data[HEADER_SIZE..];
    let mut pc = header.pc;
    let mut pages = Vec::with_capacity(NUM_RAM_BANKS);
    if pc != 0 {
        debug!("Z80 version: 1, compressed: {}", header.flags1.is_mem_compressed());
        let mem = if header.flags1.is_mem_compressed() {
            decompress(split_v1_terminator(rest), RAM_SIZE)?
        }
        else {
            read_exact_from(&mut rest, RAM_SIZE)?.to_vec()
        };
        // one block covering RAM from 0x4000 up
        for (bank, chunk) in mem.chunks(PAGE_SIZE).enumerate() {
            pages.push((PageDest::Ram(bank), chunk.to_vec()));
        }
    }
    else {
        let size_bytes = read_exact_from(&mut rest, 2)?;
        let ext_size = u16::from_le_bytes([size_bytes[0], size_bytes[1]]) as usize;
        let ext = read_exact_from(&mut rest, ext_size)?;
        if ext.len() < 3 {
            return Err(error_invalid("Z80: extension header too short"))
        }
        pc = u16::from_le_bytes([ext[0], ext[1]]);
        let hw_mode = ext[2];
        debug!("Z80 version: {}, hardware: {}", if ext_size == 23 { 2 } else { 3 }, hw_mode);
        if hw_mode >= 3 {
            return Err(error_invalid("Z80: hardware mode not supported"))
        }
        while !rest.is_empty() {
            let page_header = read_exact_from(&mut rest, 3)?;
            let size = u16::from_le_bytes([page_header[0], page_header[1]]);
            let page_nr = page_header[2];
            if size == u16::max_value() {
                // 0xFFFF would mark a page stored uncompressed
                return Err(error_invalid("Z80: an uncompressed page"))
            }
            let payload = read_exact_from(&mut rest, size as usize)?;
            let mem = decompress(payload, PAGE_SIZE)?;
            let dest = page_dest(page_nr);
            if dest == PageDest::Junk {
                warn!("Z80: page {} does not exist on a 48K, discarding", page_nr);
            }
            pages.push((dest, mem));
        }
    }
    Ok(Z80Snapshot {
        regs: cpu_regs(&header, pc),
        border: header.flags1.border_color(),
        pages
    })
}

/// Maps a page number of a 48K mode file onto the RAM banks.
fn page_dest(page_nr: u8) -> PageDest {
    // in 48K mode page 4 is the bank at 0x8000, page 5 at 0xC000
    // and page 8 the video memory bank at 0x4000
    match page_nr {
        8 => PageDest::Ram(0),
        4 => PageDest::Ram(1),
        5 => PageDest::Ram(2),
        _ => PageDest::Junk
    }
}

fn cpu_regs(header: &Header, pc: u16) -> CpuRegs {
    CpuRegs {
        a: header.a,
        f: header.f,
        bc: header.bc,
        de: header.de,
        hl: header.hl,
        af_alt: u16::from(header.a_alt) << 8 | u16::from(header.f_alt),
        bc_alt: header.bc_alt,
        de_alt: header.de_alt,
        hl_alt: header.hl_alt,
        ix: header.ix,
        iy: header.iy,
        sp: header.sp,
        pc,
        i: header.i,
        r: header.flags1.mix_r(header.r7),
        iff1: header.iff1 != 0,
        iff2: header.iff2 != 0,
        im: header.interrupt_mode()
    }
}

fn error_invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
