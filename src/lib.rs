/*
    Copyright (C) 2026  the zx48 authors

    zx48 is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    zx48 is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/
//! zx48 is a ZX Spectrum 48K emulation library built around an externally
//! supplied, tick-stepped Z80 execution engine.
//!
//! [chip::Spectrum48] is the machine: it owns memory, video, the keyboard
//! matrix, joysticks and the frame interrupt sequencer, and dispatches the
//! engine's bus transactions between them. The engine itself only needs to
//! implement [bus::TickCpu].
//!
//! The machine state can be cloned, moved across threads and, with the
//! default `snapshot` feature, serialized with `serde` via the
//! [snapshot] module. The [z80] module loads **Z80** files of versions
//! 1 to 3.
pub mod bus;
pub mod chip;
pub mod clock;
pub mod joystick;
pub mod keyboard;
pub mod memory;
pub mod snapshot;
pub mod video;
pub mod z80;

pub use bus::{Bus, BusCtrl, CpuRegs, TickCpu};
pub use chip::{Beeper, NullBeeper, Spectrum48, Spectrum48Config, UlaPortFlags};
pub use joystick::{JoystickMask, JoystickMode};
pub use keyboard::KeyboardMatrix;
pub use memory::{Memory48k, ZxMemoryError};
pub use snapshot::{Snapshot, SnapshotVersionError, SNAPSHOT_VERSION};
pub use video::{BorderColor, DisplayInfo};

#[cfg(test)]
pub(crate) mod testutil {
    use crate::bus::{Bus, BusCtrl, CpuRegs, TickCpu};

    /// An engine stub performing no transactions at all.
    #[derive(Default, Clone, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "snapshot", derive(serde::Serialize, serde::Deserialize))]
    pub struct NopCpu {
        pub regs: CpuRegs,
        pub ticks: u64
    }

    impl TickCpu for NopCpu {
        fn reset(&mut self) -> Bus {
            self.regs = CpuRegs::default();
            Bus::idle()
        }

        fn tick(&mut self, bus: Bus) -> Bus {
            self.ticks += 1;
            Bus { ctrl: bus.ctrl & BusCtrl::INT, ..Bus::idle() }
        }

        fn prefetch(&mut self, pc: u16) -> Bus {
            self.regs.pc = pc;
            Bus::mem_read(pc)
        }

        fn set_regs(&mut self, regs: &CpuRegs) {
            self.regs = *regs;
        }

        fn regs(&self) -> CpuRegs {
            self.regs
        }
    }

    /// An engine stub replaying a scripted list of transactions, then
    /// idling. Records every transaction result it is handed back.
    #[derive(Default, Clone, Debug, PartialEq, Eq)]
    #[cfg_attr(feature = "snapshot", derive(serde::Serialize, serde::Deserialize))]
    pub struct ScriptCpu {
        pub ops: Vec<Bus>,
        pub pos: usize,
        pub seen: Vec<Bus>,
        pub regs: CpuRegs
    }

    impl TickCpu for ScriptCpu {
        fn reset(&mut self) -> Bus {
            self.regs = CpuRegs::default();
            self.pos = 0;
            Bus::idle()
        }

        fn tick(&mut self, bus: Bus) -> Bus {
            self.seen.push(bus);
            let mut next = self.ops.get(self.pos).copied().unwrap_or_else(Bus::idle);
            self.pos += 1;
            next.ctrl |= bus.ctrl & BusCtrl::INT;
            next
        }

        fn prefetch(&mut self, pc: u16) -> Bus {
            self.regs.pc = pc;
            Bus::mem_read(pc)
        }

        fn set_regs(&mut self, regs: &CpuRegs) {
            self.regs = *regs;
        }

        fn regs(&self) -> CpuRegs {
            self.regs
        }
    }
}
