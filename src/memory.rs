//! Memory API: the 16K banks and the fixed 48K paging map.
use core::fmt;
use std::io;

#[cfg(feature = "snapshot")] pub mod serde;

/// The size of a single memory bank and of the 48K ROM, in bytes.
pub const BANK_SIZE: usize = 0x4000;
/// The number of pageable RAM banks of the 48K model.
pub const NUM_RAM_BANKS: usize = 3;
/// The total amount of RAM, in bytes.
pub const RAM_SIZE: usize = NUM_RAM_BANKS * BANK_SIZE;
/// The size of the video memory region at the bottom of the first RAM bank:
/// 6144 bytes of INK/PAPER bitmap followed by 768 attribute cells.
pub const SCREEN_SIZE: usize = 0x1B00;

/// A single 16K memory bank.
pub type MemBank = [u8; BANK_SIZE];

/// The error type returned by memory operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZxMemoryError {
    /// The provided ROM image does not cover the ROM area exactly.
    InvalidRomSize(usize),
    /// A RAM bank index outside of `0..NUM_RAM_BANKS`.
    InvalidBankIndex(usize),
}

impl fmt::Display for ZxMemoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ZxMemoryError::InvalidRomSize(size) => {
                write!(f, "invalid ROM size: {} bytes, expected {}", size, BANK_SIZE)
            }
            ZxMemoryError::InvalidBankIndex(index) => {
                write!(f, "invalid RAM bank index: {}", index)
            }
        }
    }
}

impl std::error::Error for ZxMemoryError {}

impl From<ZxMemoryError> for io::Error {
    fn from(err: ZxMemoryError) -> Self {
        io::Error::new(io::ErrorKind::InvalidData, err.to_string())
    }
}

/// The bank a 16-bit address resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bank {
    Rom,
    Ram(usize)
}

/// Decomposes an address into the bank it pages into and the offset inside it.
///
/// The 48K map is fixed: the bottom quarter of the address space is ROM and
/// each following quarter is a consecutive RAM bank.
#[inline(always)]
pub fn bank_at(addr: u16) -> (Bank, usize) {
    let offset = (addr & 0x3FFF) as usize;
    match addr >> 14 {
        0 => (Bank::Rom, offset),
        page => (Bank::Ram(page as usize - 1), offset)
    }
}

/// The memory of the ZX Spectrum 48K: one ROM bank and three RAM banks,
/// with an extra scratch bank absorbing writes that target no real RAM.
#[cfg_attr(feature = "snapshot", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Clone, PartialEq, Eq)]
pub struct Memory48k {
    #[cfg_attr(feature = "snapshot", serde(serialize_with = "serde::serialize_bank",
                                           deserialize_with = "serde::deserialize_bank"))]
    rom: Box<MemBank>,
    #[cfg_attr(feature = "snapshot", serde(serialize_with = "serde::serialize_banks",
                                           deserialize_with = "serde::deserialize_banks"))]
    ram: [Box<MemBank>; NUM_RAM_BANKS],
    #[cfg_attr(feature = "snapshot", serde(skip, default = "new_bank"))]
    junk: Box<MemBank>,
}

fn new_bank() -> Box<MemBank> {
    Box::new([0u8; BANK_SIZE])
}

impl fmt::Debug for Memory48k {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memory48k")
         .field("rom", &format_args!("[..{}]", BANK_SIZE))
         .field("ram", &format_args!("[..{}] x {}", BANK_SIZE, NUM_RAM_BANKS))
         .finish()
    }
}

impl Memory48k {
    /// Creates memory with zeroed RAM and the ROM area filled from `rom`.
    ///
    /// `rom` must be exactly [BANK_SIZE] bytes long.
    pub fn new(rom: &[u8]) -> Result<Memory48k, ZxMemoryError> {
        if rom.len() != BANK_SIZE {
            return Err(ZxMemoryError::InvalidRomSize(rom.len()))
        }
        let mut rom_bank = new_bank();
        rom_bank.copy_from_slice(rom);
        Ok(Memory48k {
            rom: rom_bank,
            ram: [new_bank(), new_bank(), new_bank()],
            junk: new_bank()
        })
    }

    /// Reads a single byte. Every address is readable.
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        match bank_at(addr) {
            (Bank::Rom, offset) => self.rom[offset],
            (Bank::Ram(bank), offset) => self.ram[bank][offset]
        }
    }

    /// Writes a single byte. Writes into the ROM area are ignored.
    #[inline]
    pub fn write(&mut self, addr: u16, data: u8) {
        if let (Bank::Ram(bank), offset) = bank_at(addr) {
            self.ram[bank][offset] = data;
        }
    }

    /// Returns a reference to the ROM bank.
    pub fn rom_ref(&self) -> &MemBank {
        &self.rom
    }

    /// Returns a reference to the video memory region.
    pub fn screen_ref(&self) -> &[u8] {
        &self.ram[0][..SCREEN_SIZE]
    }

    /// Returns a reference to the indicated RAM bank.
    pub fn ram_bank_ref(&self, bank: usize) -> Result<&MemBank, ZxMemoryError> {
        self.ram.get(bank).map(|bank| &**bank)
                          .ok_or(ZxMemoryError::InvalidBankIndex(bank))
    }

    /// Returns a mutable reference to the indicated RAM bank.
    pub fn ram_bank_mut(&mut self, bank: usize) -> Result<&mut MemBank, ZxMemoryError> {
        self.ram.get_mut(bank).map(|bank| &mut **bank)
                              .ok_or(ZxMemoryError::InvalidBankIndex(bank))
    }

    /// Returns a mutable reference to the scratch bank.
    ///
    /// The scratch bank is not addressable by the CPU. Snapshot pages that
    /// target no bank of the 48K model are unpacked into it and forgotten.
    pub fn junk_bank_mut(&mut self) -> &mut MemBank {
        &mut self.junk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom() -> Vec<u8> {
        (0..BANK_SIZE).map(|n| n as u8).collect()
    }

    #[test]
    fn rom_size_is_validated() {
        assert_eq!(Memory48k::new(&[]).unwrap_err(), ZxMemoryError::InvalidRomSize(0));
        assert_eq!(Memory48k::new(&[0; BANK_SIZE + 1]).unwrap_err(),
                   ZxMemoryError::InvalidRomSize(BANK_SIZE + 1));
        assert!(Memory48k::new(&test_rom()).is_ok());
    }

    #[test]
    fn every_address_resolves_to_a_bank() {
        assert_eq!(bank_at(0x0000), (Bank::Rom, 0));
        assert_eq!(bank_at(0x3FFF), (Bank::Rom, 0x3FFF));
        assert_eq!(bank_at(0x4000), (Bank::Ram(0), 0));
        assert_eq!(bank_at(0x7FFF), (Bank::Ram(0), 0x3FFF));
        assert_eq!(bank_at(0x8000), (Bank::Ram(1), 0));
        assert_eq!(bank_at(0xC000), (Bank::Ram(2), 0));
        assert_eq!(bank_at(0xFFFF), (Bank::Ram(2), 0x3FFF));
    }

    #[test]
    fn rom_reads_writes_ignored() {
        let mut memory = Memory48k::new(&test_rom()).unwrap();
        assert_eq!(memory.read(0x0000), 0);
        assert_eq!(memory.read(0x0105), 5);
        memory.write(0x0105, 0xFF);
        assert_eq!(memory.read(0x0105), 5);
    }

    #[test]
    fn ram_reads_back_writes() {
        let mut memory = Memory48k::new(&test_rom()).unwrap();
        for addr in [0x4000u16, 0x7FFF, 0x8000, 0xBFFF, 0xC000, 0xFFFF] {
            assert_eq!(memory.read(addr), 0);
            memory.write(addr, 0x42);
            assert_eq!(memory.read(addr), 0x42);
        }
        assert_eq!(memory.ram_bank_ref(0).unwrap()[0], 0x42);
        assert_eq!(memory.ram_bank_ref(2).unwrap()[0x3FFF], 0x42);
    }

    #[test]
    fn bank_index_is_validated() {
        let mut memory = Memory48k::new(&test_rom()).unwrap();
        assert_eq!(memory.ram_bank_mut(3).unwrap_err(), ZxMemoryError::InvalidBankIndex(3));
        assert!(memory.ram_bank_ref(2).is_ok());
    }

    #[test]
    fn junk_bank_is_invisible() {
        let mut memory = Memory48k::new(&test_rom()).unwrap();
        memory.junk_bank_mut().fill(0xEE);
        for addr in (0u32..=0xFFFF).step_by(0x100) {
            assert_ne!(memory.read(addr as u16), 0xEE);
        }
    }
}
