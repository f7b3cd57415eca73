/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! Whole-machine snapshots.
//!
//! A [Snapshot] is a version-tagged copy of everything a [Spectrum48]
//! holds, including the CPU engine. With the `snapshot` feature enabled it
//! can be serialized with any `serde` serializer: memory is emitted as
//! base64 by human-readable formats and as raw bytes by binary ones.
use core::fmt;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use crate::bus::TickCpu;
use crate::chip::Spectrum48;

/// The version tag written into snapshots taken by this build.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A transferable copy of the whole machine state.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot<C> {
    version: u32,
    machine: Spectrum48<C>
}

impl<C> Snapshot<C> {
    pub fn version(&self) -> u32 {
        self.version
    }
}

/// The error type returned when restoring a snapshot with an unknown
/// version tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotVersionError {
    pub expected: u32,
    pub found: u32
}

impl fmt::Display for SnapshotVersionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown snapshot version: {}, expected: {}", self.found, self.expected)
    }
}

impl std::error::Error for SnapshotVersionError {}

impl<C: TickCpu + Clone> Spectrum48<C> {
    /// Takes a complete snapshot of the machine.
    pub fn save_snapshot(&self) -> Snapshot<C> {
        Snapshot {
            version: SNAPSHOT_VERSION,
            machine: self.clone()
        }
    }

    /// Replaces the whole machine state with the snapshot's copy.
    ///
    /// The machine is left untouched unless the version tag is recognized.
    pub fn load_snapshot(&mut self, snapshot: &Snapshot<C>) -> Result<(), SnapshotVersionError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotVersionError {
                expected: SNAPSHOT_VERSION,
                found: snapshot.version
            })
        }
        *self = snapshot.machine.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::{NullBeeper, Spectrum48Config};
    use crate::memory::BANK_SIZE;
    use crate::testutil::NopCpu;

    fn test_machine() -> Spectrum48<NopCpu> {
        Spectrum48::new(&[0u8; BANK_SIZE], Spectrum48Config::default()).unwrap()
    }

    #[test]
    fn snapshots_restore_the_machine() {
        let mut spectrum = test_machine();
        spectrum.memory_mut().write(0x8123, 0x42);
        spectrum.key_down(b'j');
        spectrum.step_ticks(1000, &mut NullBeeper);
        let snap = spectrum.save_snapshot();
        assert_eq!(snap.version(), SNAPSHOT_VERSION);

        let mut other = test_machine();
        other.load_snapshot(&snap).unwrap();
        assert_eq!(other, spectrum);
        assert_eq!(other.memory_ref().read(0x8123), 0x42);
        // both machines continue in lock step
        spectrum.step_ticks(100, &mut NullBeeper);
        other.step_ticks(100, &mut NullBeeper);
        assert_eq!(other, spectrum);
    }

    #[test]
    fn unknown_versions_are_rejected() {
        let spectrum = test_machine();
        let snap = Snapshot { version: SNAPSHOT_VERSION + 1, machine: spectrum.clone() };
        let mut target = test_machine();
        target.memory_mut().write(0xFFFF, 7);
        let before = target.clone();
        let err = target.load_snapshot(&snap).unwrap_err();
        assert_eq!(err, SnapshotVersionError {
            expected: SNAPSHOT_VERSION,
            found: SNAPSHOT_VERSION + 1
        });
        assert_eq!(target, before);
    }
}
