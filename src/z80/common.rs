/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
use core::convert::TryInto;
use std::io;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use bitflags::bitflags;

use crate::video::BorderColor;

/// The size of the fixed part of a **Z80** file header.
pub const HEADER_SIZE: usize = 30;
/// The size of a memory page.
pub const PAGE_SIZE: usize = 0x4000;
/// The end of data marker of a version 1 compressed memory block.
pub const MEMORY_V1_TERM: &[u8] = &[0, 0xED, 0xED, 0];

bitflags! {
    /// The first bit field of a **Z80** header.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "snapshot", serde(from = "u8", into = "u8"))]
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Flags1: u8 {
        const R_HIGH_BIT     = 0b0000_0001;
        const BORDER_COLOR   = 0b0000_1110;
        const BASIC_SAMROM   = 0b0001_0000;
        const MEM_COMPRESSED = 0b0010_0000;
    }
}

impl From<u8> for Flags1 {
    fn from(byte: u8) -> Flags1 {
        // 255 has to be regarded the same as 1, per the format docs
        let byte = if byte == u8::max_value() { 1 } else { byte };
        Flags1::from_bits_truncate(byte)
    }
}

impl From<Flags1> for u8 {
    fn from(flags: Flags1) -> u8 {
        flags.bits()
    }
}

impl Flags1 {
    /// Returns the border color.
    pub fn border_color(self) -> BorderColor {
        BorderColor::from_bits_truncate((self & Flags1::BORDER_COLOR).bits() >> 1)
    }

    /// Returns `true` if a version 1 memory block is compressed.
    pub fn is_mem_compressed(self) -> bool {
        self.contains(Flags1::MEM_COMPRESSED)
    }

    /// Merges the R register's bit 7 into its lower 7 bits.
    pub fn mix_r(self, r7: u8) -> u8 {
        r7 & 0x7F | if self.contains(Flags1::R_HIGH_BIT) { 0x80 } else { 0 }
    }
}

/// The fixed 30-byte header of a **Z80** file, fields decoded from their
/// documented offsets.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub a: u8,
    pub f: u8,
    pub bc: u16,
    pub hl: u16,
    /// Zero marks a version 2 or 3 file with an extension header.
    pub pc: u16,
    pub sp: u16,
    pub i: u8,
    /// The lower 7 bits of the R register.
    pub r7: u8,
    pub flags1: Flags1,
    pub de: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub a_alt: u8,
    pub f_alt: u8,
    pub iy: u16,
    pub ix: u16,
    pub iff1: u8,
    pub iff2: u8,
    pub flags2: u8
}

impl Header {
    /// Decodes the fixed header from the beginning of `data`.
    pub fn from_bytes(data: &[u8]) -> io::Result<Header> {
        let raw: &[u8; HEADER_SIZE] = data.get(..HEADER_SIZE)
            .and_then(|slice| slice.try_into().ok())
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof,
                            "Z80: header too short"))?;
        let word = |offset: usize| u16::from_le_bytes([raw[offset], raw[offset + 1]]);
        Ok(Header {
            a: raw[0],
            f: raw[1],
            bc: word(2),
            hl: word(4),
            pc: word(6),
            sp: word(8),
            i: raw[10],
            r7: raw[11],
            flags1: Flags1::from(raw[12]),
            de: word(13),
            bc_alt: word(15),
            de_alt: word(17),
            hl_alt: word(19),
            a_alt: raw[21],
            f_alt: raw[22],
            iy: word(23),
            ix: word(25),
            iff1: raw[27],
            iff2: raw[28],
            flags2: raw[29]
        })
    }

    /// Returns the interrupt mode from the second bit field.
    ///
    /// Some version 1 emulators wrote 255 here; it decodes as mode 1.
    pub fn interrupt_mode(&self) -> u8 {
        if self.flags2 == u8::max_value() { 1 } else { self.flags2 & 3 }
    }
}

/// Reads `len` bytes following the already consumed part of `data`.
pub(super) fn read_exact_from<'a>(data: &mut &'a [u8], len: usize) -> io::Result<&'a [u8]> {
    if data.len() < len {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof,
                    "Z80: unexpected end of file"))
    }
    let (res, rest) = data.split_at(len);
    *data = rest;
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags1_from_u8() {
        assert_eq!(Flags1::from(0xFF), Flags1::R_HIGH_BIT);
        assert_eq!(Flags1::from(0b0010_1101).bits(), 0b0010_1101);
        assert_eq!(Flags1::from(0b0010_1101).border_color(), BorderColor::YELLOW);
        assert!(Flags1::from(0b0010_1101).is_mem_compressed());
        let flags = Flags1::from(0b0000_1010);
        assert_eq!(flags.border_color(), BorderColor::CYAN);
        assert!(!flags.is_mem_compressed());
        assert_eq!(flags.mix_r(0x7F), 0x7F);
        assert_eq!(Flags1::from(1).mix_r(0x7F), 0xFF);
        assert_eq!(Flags1::from(1).mix_r(0xFF), 0xFF);
    }

    #[test]
    fn header_decodes_documented_offsets() {
        let mut raw = [0u8; HEADER_SIZE];
        for (index, byte) in raw.iter_mut().enumerate() {
            *byte = index as u8 + 1;
        }
        let header = Header::from_bytes(&raw).unwrap();
        assert_eq!(header.a, 1);
        assert_eq!(header.f, 2);
        assert_eq!(header.bc, 0x0403);
        assert_eq!(header.hl, 0x0605);
        assert_eq!(header.pc, 0x0807);
        assert_eq!(header.sp, 0x0A09);
        assert_eq!(header.i, 11);
        assert_eq!(header.r7, 12);
        assert_eq!(header.flags1, Flags1::from(13));
        assert_eq!(header.de, 0x0F0E);
        assert_eq!(header.bc_alt, 0x1110);
        assert_eq!(header.de_alt, 0x1312);
        assert_eq!(header.hl_alt, 0x1514);
        assert_eq!(header.a_alt, 22);
        assert_eq!(header.f_alt, 23);
        assert_eq!(header.iy, 0x1918);
        assert_eq!(header.ix, 0x1B1A);
        assert_eq!(header.iff1, 28);
        assert_eq!(header.iff2, 29);
        assert_eq!(header.flags2, 30);
    }

    #[test]
    fn short_header_is_an_error() {
        let err = Header::from_bytes(&[0u8; HEADER_SIZE - 1]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn interrupt_mode_quirk() {
        let mut header = Header::default();
        assert_eq!(header.interrupt_mode(), 0);
        header.flags2 = 0xFF;
        assert_eq!(header.interrupt_mode(), 1);
        header.flags2 = 0b0100_0110;
        assert_eq!(header.interrupt_mode(), 2);
    }
}
