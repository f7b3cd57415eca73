/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! The ZX Spectrum 48K machine: bus dispatch, the ULA I/O port and the
//! frame interrupt sequencer, tying the CPU engine to memory, video,
//! keyboard and joysticks.
use std::io;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use bitflags::bitflags;

use crate::bus::{Bus, BusCtrl, TickCpu};
use crate::clock::{CPU_CLOCK_HZ, duration_to_ticks};
use crate::joystick::{JoystickMask, JoystickMode, JoystickPort};
use crate::keyboard::KeyboardMatrix;
use crate::memory::{Memory48k, ZxMemoryError};
use crate::video::{
    BorderColor, DisplayInfo, FrameBuffer,
    DISPLAY_WIDTH, DISPLAY_HEIGHT, FRAME_BUFFER_PITCH, FRAME_BUFFER_SIZE, PALETTE
};
use crate::z80;

bitflags! {
    /// The bits of the `0xFE` ULA port.
    ///
    /// On write the border color, the MIC and the EAR output are latched.
    /// On read bits 5 and 7 are always set and bit 6 feeds back the last
    /// latched EAR/MIC output; the low 5 bits carry the keyboard lines.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "snapshot", serde(from = "u8", into = "u8"))]
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct UlaPortFlags: u8 {
        const BORDER0  = 0b0000_0001;
        const BORDER1  = 0b0000_0010;
        const BORDER2  = 0b0000_0100;
        const MIC_OUT  = 0b0000_1000;
        const EAR_OUT  = 0b0001_0000;
        const UNUSED5  = 0b0010_0000;
        const EAR_IN   = 0b0100_0000;
        const UNUSED7  = 0b1000_0000;
    }
}

impl UlaPortFlags {
    pub const BORDER_MASK: UlaPortFlags = UlaPortFlags::from_bits_retain(0b111);
    pub const EAR_MIC_MASK: UlaPortFlags = UlaPortFlags::from_bits_retain(0b1_1000);
}

impl From<u8> for UlaPortFlags {
    fn from(flags: u8) -> UlaPortFlags {
        UlaPortFlags::from_bits_retain(flags)
    }
}

impl From<UlaPortFlags> for u8 {
    fn from(flags: UlaPortFlags) -> u8 {
        flags.bits()
    }
}

/// Receives the EAR line level synchronously, whenever a write to the ULA
/// port changes it.
pub trait Beeper {
    fn set_level(&mut self, level: bool);
}

/// A [Beeper] discarding the output, for hosts without sound.
#[derive(Default, Clone, Copy, Debug)]
pub struct NullBeeper;

impl Beeper for NullBeeper {
    #[inline]
    fn set_level(&mut self, _level: bool) {}
}

/// For how many clock ticks the frame interrupt line is held asserted.
pub const INT_HOLD_TICKS: i32 = 32;

/// Construction-time parameters of [Spectrum48].
///
/// The defaults follow the PAL raster of the real machine. Shorter frames
/// are useful in tests that should wrap frames quickly.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Spectrum48Config {
    pub joystick: JoystickMode,
    /// Clock ticks per scan line.
    pub scanline_period: u32,
    /// Scan lines per frame.
    pub frame_scan_lines: u16,
    /// Scan lines above the first bitmap line.
    pub top_border_scanlines: u16
}

impl Default for Spectrum48Config {
    fn default() -> Spectrum48Config {
        Spectrum48Config {
            joystick: JoystickMode::None,
            scanline_period: 224,
            frame_scan_lines: 312,
            top_border_scanlines: 64
        }
    }
}

fn new_frame_buffer() -> Box<FrameBuffer> {
    Box::new([0u8; FRAME_BUFFER_SIZE])
}

/// A complete ZX Spectrum 48K with a pluggable CPU execution engine.
///
/// The machine advances in whole clock ticks: each tick the engine is
/// stepped, its bus transaction is dispatched to memory or I/O, and the
/// raster position and the interrupt line are updated. Hosts drive it with
/// [exec][Spectrum48::exec] and present [frame_buffer][Spectrum48::frame_buffer]
/// whenever convenient; no synchronization with frame wraps is required.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum48<C> {
    pub(crate) cpu: C,
    pub(crate) bus: Bus,
    pub(crate) memory: Memory48k,
    pub(crate) keyboard: KeyboardMatrix,
    pub(crate) joystick: JoystickPort,
    pub(crate) ula_out: UlaPortFlags,
    pub(crate) border: BorderColor,
    pub(crate) blink_counter: u8,
    pub(crate) scanline_period: i32,
    pub(crate) scanline_counter: i32,
    pub(crate) frame_scan_lines: u16,
    pub(crate) top_border_scanlines: u16,
    pub(crate) scanline: u16,
    pub(crate) int_counter: i32,
    #[cfg_attr(feature = "snapshot", serde(serialize_with = "crate::memory::serde::serialize_bank",
                                           deserialize_with = "crate::memory::serde::deserialize_bank"))]
    pub(crate) frame_buffer: Box<FrameBuffer>,
}

impl<C: TickCpu + Default> Spectrum48<C> {
    /// Creates a machine with the given 16K ROM image and a default-built
    /// engine held in its power-on state.
    pub fn new(rom: &[u8], config: Spectrum48Config) -> Result<Spectrum48<C>, ZxMemoryError> {
        let memory = Memory48k::new(rom)?;
        let mut cpu = C::default();
        let bus = cpu.reset();
        Ok(Spectrum48 {
            cpu, bus, memory,
            keyboard: KeyboardMatrix::new(),
            joystick: JoystickPort::new(config.joystick),
            ula_out: UlaPortFlags::empty(),
            border: BorderColor::BLACK,
            blink_counter: 0,
            scanline_period: config.scanline_period as i32,
            scanline_counter: config.scanline_period as i32,
            frame_scan_lines: config.frame_scan_lines,
            top_border_scanlines: config.top_border_scanlines,
            scanline: 0,
            int_counter: 0,
            frame_buffer: new_frame_buffer()
        })
    }
}

impl<C: TickCpu> Spectrum48<C> {
    /// Resets the machine as the power switch would: the engine restarts
    /// from its power-on state, held keys are released and the raster
    /// returns to the frame top. Memory contents are preserved.
    pub fn reset(&mut self) {
        self.bus = self.cpu.reset();
        self.joystick.release_all(&mut self.keyboard);
        self.keyboard.clear();
        self.ula_out = UlaPortFlags::empty();
        self.blink_counter = 0;
        self.scanline_counter = self.scanline_period;
        self.scanline = 0;
        self.int_counter = 0;
    }

    /// Runs the machine for the given wall-clock duration in microseconds,
    /// converted at the CPU clock frequency. Returns the number of clock
    /// ticks executed.
    pub fn exec<B: Beeper>(&mut self, micro_seconds: u32, beeper: &mut B) -> u32 {
        let ticks = duration_to_ticks(CPU_CLOCK_HZ, micro_seconds);
        self.step_ticks(ticks, beeper);
        ticks
    }

    /// Runs the machine for an exact number of clock ticks.
    pub fn step_ticks<B: Beeper>(&mut self, ticks: u32, beeper: &mut B) {
        for _ in 0..ticks {
            self.tick(beeper);
        }
    }

    fn tick<B: Beeper>(&mut self, beeper: &mut B) {
        let mut bus = self.cpu.tick(self.bus);
        self.dispatch(&mut bus, beeper);
        self.scanline_counter -= 1;
        if self.scanline_counter <= 0 {
            self.scanline_counter += self.scanline_period;
            if self.decode_scanline() {
                bus.ctrl.insert(BusCtrl::INT);
                self.int_counter = INT_HOLD_TICKS;
            }
        }
        if bus.ctrl.contains(BusCtrl::INT) {
            self.int_counter -= 1;
            if self.int_counter < 0 {
                bus.ctrl.remove(BusCtrl::INT);
            }
        }
        self.bus = bus;
    }

    fn dispatch<B: Beeper>(&mut self, bus: &mut Bus, beeper: &mut B) {
        let ctrl = bus.ctrl;
        if ctrl.contains(BusCtrl::MREQ) {
            if ctrl.contains(BusCtrl::RD) {
                bus.data = self.memory.read(bus.addr);
            }
            else if ctrl.contains(BusCtrl::WR) {
                self.memory.write(bus.addr, bus.data);
            }
        }
        else if ctrl.contains(BusCtrl::IORQ) {
            if bus.addr & 1 == 0 {
                // every even port belongs to the ULA
                if ctrl.contains(BusCtrl::RD) {
                    bus.data = self.ula_read(bus.addr);
                }
                else if ctrl.contains(BusCtrl::WR) {
                    self.ula_write(bus.data, beeper);
                }
            }
            else if ctrl.contains(BusCtrl::RD) && bus.addr & 0xE0 == 0 {
                // the Kempston interface decodes address bits 5 to 7 low
                bus.data = self.joystick.port_read();
            }
        }
    }

    pub(crate) fn ula_read(&self, port: u16) -> u8 {
        let mut flags = UlaPortFlags::UNUSED5|UlaPortFlags::UNUSED7;
        if self.ula_out.intersects(UlaPortFlags::EAR_MIC_MASK) {
            flags.insert(UlaPortFlags::EAR_IN);
        }
        // half-rows to scan are selected, active low, by the upper address byte
        let rows = !(port >> 8) as u8;
        let lines = self.keyboard.read_lines(rows);
        flags.bits() | (!lines & 0b0001_1111)
    }

    fn ula_write<B: Beeper>(&mut self, data: u8, beeper: &mut B) {
        let flags = UlaPortFlags::from(data);
        self.border = BorderColor::from_bits_truncate(data);
        beeper.set_level(flags.contains(UlaPortFlags::EAR_OUT));
        self.ula_out = flags;
    }

    /// Presses the key with the given code, letting the joystick front-end
    /// intercept the reserved codes first.
    pub fn key_down(&mut self, code: u8) {
        if !self.joystick.key_down(&mut self.keyboard, code) {
            self.keyboard.key_down(code);
        }
    }

    /// Releases the key with the given code.
    pub fn key_up(&mut self, code: u8) {
        if !self.joystick.key_up(&mut self.keyboard, code) {
            self.keyboard.key_up(code);
        }
    }

    /// Applies the state of a host gamepad to the selected joystick.
    pub fn joystick(&mut self, mask: JoystickMask) {
        self.joystick.set_joystick(&mut self.keyboard, mask);
    }

    /// Switches the emulated joystick, releasing any held joystick input.
    pub fn select_joystick(&mut self, mode: JoystickMode) {
        self.joystick.select_mode(&mut self.keyboard, mode);
    }

    pub fn joystick_mode(&self) -> JoystickMode {
        self.joystick.mode()
    }

    /// Loads a **Z80** snapshot and resumes execution at its program
    /// counter.
    ///
    /// The snapshot is parsed and unpacked completely before the machine is
    /// touched; on error the machine state is left exactly as it was.
    pub fn quickload(&mut self, data: &[u8]) -> io::Result<()> {
        let snap = z80::parse(data)?;
        self.bus = self.cpu.reset();
        for (dest, bytes) in snap.pages.iter() {
            let bank = match *dest {
                z80::PageDest::Ram(bank) => self.memory.ram_bank_mut(bank)?,
                z80::PageDest::Junk => self.memory.junk_bank_mut()
            };
            bank[..bytes.len()].copy_from_slice(bytes);
        }
        self.cpu.set_regs(&snap.regs);
        self.bus = self.cpu.prefetch(snap.regs.pc);
        self.border = snap.border;
        Ok(())
    }

    /// Returns the frame buffer geometry and the palette. The returned
    /// properties never change over the lifetime of the machine.
    pub fn display_info(&self) -> DisplayInfo {
        DisplayInfo {
            frame_pitch: FRAME_BUFFER_PITCH,
            frame_lines: DISPLAY_HEIGHT,
            display_width: DISPLAY_WIDTH,
            display_height: DISPLAY_HEIGHT,
            palette: PALETTE
        }
    }

    /// Returns the frame buffer: [DISPLAY_HEIGHT] lines of packed 4-bit
    /// palette indices, the even pixel of each pair in the high nibble.
    pub fn frame_buffer(&self) -> &FrameBuffer {
        &self.frame_buffer
    }

    /// Returns `true` while the frame interrupt line is asserted.
    pub fn is_irq(&self) -> bool {
        self.bus.is_irq()
    }

    pub fn border_color(&self) -> BorderColor {
        self.border
    }

    pub fn cpu_ref(&self) -> &C {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut C {
        &mut self.cpu
    }

    pub fn memory_ref(&self) -> &Memory48k {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory48k {
        &mut self.memory
    }

    pub fn keyboard_ref(&self) -> &KeyboardMatrix {
        &self.keyboard
    }
}
