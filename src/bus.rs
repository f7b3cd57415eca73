/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! The transaction model of the system bus shared between the machine and
//! the CPU execution engine.
//!
//! The engine is advanced one clock tick at a time. Each tick it receives
//! the [Bus] it saw after the previous tick, with memory or I/O data filled
//! in by the machine, and returns the transaction it wants performed next.
//! The machine owns the `INT` line: engines must carry it over unchanged
//! from the received transaction to the returned one.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use bitflags::bitflags;

bitflags! {
    /// Control line flags of a single bus transaction.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "snapshot", serde(from = "u8", into = "u8"))]
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BusCtrl: u8 {
        const MREQ = 0b0000_0001;
        const IORQ = 0b0000_0010;
        const RD   = 0b0000_0100;
        const WR   = 0b0000_1000;
        const INT  = 0b0001_0000;
    }
}

impl From<u8> for BusCtrl {
    fn from(flags: u8) -> BusCtrl {
        BusCtrl::from_bits_truncate(flags)
    }
}

impl From<BusCtrl> for u8 {
    fn from(flags: BusCtrl) -> u8 {
        flags.bits()
    }
}

/// A single bus transaction: address and data lines latched together with
/// the control flags driving them.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bus {
    pub addr: u16,
    pub data: u8,
    pub ctrl: BusCtrl
}

impl Bus {
    /// Returns an idle transaction with all control lines released.
    #[inline]
    pub fn idle() -> Bus {
        Bus::default()
    }

    /// Returns a memory read request at `addr`.
    #[inline]
    pub fn mem_read(addr: u16) -> Bus {
        Bus { addr, data: 0, ctrl: BusCtrl::MREQ|BusCtrl::RD }
    }

    /// Returns a memory write request of `data` at `addr`.
    #[inline]
    pub fn mem_write(addr: u16, data: u8) -> Bus {
        Bus { addr, data, ctrl: BusCtrl::MREQ|BusCtrl::WR }
    }

    /// Returns an I/O read request at `port`.
    #[inline]
    pub fn io_read(port: u16) -> Bus {
        Bus { addr: port, data: 0, ctrl: BusCtrl::IORQ|BusCtrl::RD }
    }

    /// Returns an I/O write request of `data` at `port`.
    #[inline]
    pub fn io_write(port: u16, data: u8) -> Bus {
        Bus { addr: port, data, ctrl: BusCtrl::IORQ|BusCtrl::WR }
    }

    /// Returns `true` if the maskable interrupt line is being asserted.
    #[inline]
    pub fn is_irq(self) -> bool {
        self.ctrl.contains(BusCtrl::INT)
    }
}

/// A complete Z80 register file, used to seed and inspect the execution
/// engine around snapshot transfers.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuRegs {
    pub a: u8,
    pub f: u8,
    pub bc: u16,
    pub de: u16,
    pub hl: u16,
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,
    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,
    pub iff1: bool,
    pub iff2: bool,
    pub im: u8
}

/// The interface of a tick-stepped Z80 execution engine.
///
/// The machine is generic over this trait and never interprets opcodes
/// itself. Besides stepping, an engine must be able to expose and replace
/// its register file so snapshots can be transferred in both directions.
pub trait TickCpu {
    /// Puts the engine in its power-on state and returns the first
    /// transaction to perform.
    fn reset(&mut self) -> Bus;
    /// Advances the engine by one clock tick.
    ///
    /// `bus` is the transaction returned by the previous tick with any
    /// requested data filled in. Implementations must preserve the
    /// [BusCtrl::INT] flag in the returned transaction.
    fn tick(&mut self, bus: Bus) -> Bus;
    /// Forces the program counter to `pc`, abandoning any instruction in
    /// flight, and returns the opcode fetch transaction at the new address.
    fn prefetch(&mut self, pc: u16) -> Bus;
    /// Replaces the whole register file.
    fn set_regs(&mut self, regs: &CpuRegs);
    /// Returns a copy of the register file.
    fn regs(&self) -> CpuRegs;
}
