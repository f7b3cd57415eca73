/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! Kempston and Sinclair joystick emulation.
//!
//! A Kempston joystick is a real peripheral with its own I/O port, while
//! the Sinclair "joysticks" are fixed digit-key chords read through the
//! keyboard matrix. Both can be driven either from a host gamepad, via
//! [JoystickPort::set_joystick], or from reserved key codes of the host
//! keyboard such as the cursor keys.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use bitflags::bitflags;

use crate::keyboard::KeyboardMatrix;

/// The reserved key code of joystick left (also cursor left).
pub const KEY_JOY_LEFT: u8 = 0x08;
/// The reserved key code of joystick right (also cursor right).
pub const KEY_JOY_RIGHT: u8 = 0x09;
/// The reserved key code of joystick down (also cursor down).
pub const KEY_JOY_DOWN: u8 = 0x0A;
/// The reserved key code of joystick up (also cursor up).
pub const KEY_JOY_UP: u8 = 0x0B;
/// The reserved key code of the joystick fire button.
pub const KEY_JOY_FIRE: u8 = 0x20;

bitflags! {
    /// Kempston-style joystick state bits, active high.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "snapshot", serde(from = "u8", into = "u8"))]
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct JoystickMask: u8 {
        const RIGHT = 0b0000_0001;
        const LEFT  = 0b0000_0010;
        const DOWN  = 0b0000_0100;
        const UP    = 0b0000_1000;
        const FIRE  = 0b0001_0000;
    }
}

impl From<u8> for JoystickMask {
    fn from(mask: u8) -> JoystickMask {
        JoystickMask::from_bits_truncate(mask)
    }
}

impl From<JoystickMask> for u8 {
    fn from(mask: JoystickMask) -> u8 {
        mask.bits()
    }
}

/// Selects which joystick, if any, is being emulated.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoystickMode {
    None,
    Kempston,
    Sinclair1,
    Sinclair2
}

impl Default for JoystickMode {
    fn default() -> JoystickMode {
        JoystickMode::None
    }
}

const SINCLAIR1_KEYS: [u8; 5] = [b'1', b'2', b'3', b'4', b'5'];
const SINCLAIR2_KEYS: [u8; 5] = [b'6', b'7', b'8', b'9', b'0'];

impl JoystickMode {
    /// Returns the digit key the Sinclair standards assign to the given
    /// reserved key code, or `None` in the other modes.
    fn sinclair_key(self, code: u8) -> Option<u8> {
        let keys = match self {
            JoystickMode::Sinclair1 => &SINCLAIR1_KEYS,
            JoystickMode::Sinclair2 => &SINCLAIR2_KEYS,
            _ => return None
        };
        match code {
            KEY_JOY_LEFT => Some(keys[0]),
            KEY_JOY_RIGHT => Some(keys[1]),
            KEY_JOY_DOWN => Some(keys[2]),
            KEY_JOY_UP => Some(keys[3]),
            KEY_JOY_FIRE => Some(keys[4]),
            _ => None
        }
    }
}

fn kempston_bit(code: u8) -> Option<JoystickMask> {
    match code {
        KEY_JOY_LEFT => Some(JoystickMask::LEFT),
        KEY_JOY_RIGHT => Some(JoystickMask::RIGHT),
        KEY_JOY_DOWN => Some(JoystickMask::DOWN),
        KEY_JOY_UP => Some(JoystickMask::UP),
        KEY_JOY_FIRE => Some(JoystickMask::FIRE),
        _ => None
    }
}

/// The joystick front-end of the machine.
///
/// In Kempston mode two state masks are kept: one driven by reserved key
/// codes and one by [set_joystick][JoystickPort::set_joystick]; the port
/// reads back their union, so a keyboard and a gamepad can be used at once.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct JoystickPort {
    mode: JoystickMode,
    kbd_mask: JoystickMask,
    ext_mask: JoystickMask
}

impl JoystickPort {
    pub fn new(mode: JoystickMode) -> JoystickPort {
        JoystickPort { mode, ..Default::default() }
    }

    pub fn mode(&self) -> JoystickMode {
        self.mode
    }

    /// Switches the emulated joystick, releasing any held state.
    pub fn select_mode(&mut self, kbd: &mut KeyboardMatrix, mode: JoystickMode) {
        self.release_all(kbd);
        self.mode = mode;
    }

    /// Releases every input this port ever pressed.
    pub fn release_all(&mut self, kbd: &mut KeyboardMatrix) {
        self.kbd_mask = JoystickMask::empty();
        self.ext_mask = JoystickMask::empty();
        for &code in &[KEY_JOY_LEFT, KEY_JOY_RIGHT, KEY_JOY_DOWN, KEY_JOY_UP, KEY_JOY_FIRE] {
            if let Some(key) = self.mode.sinclair_key(code) {
                kbd.key_up(key);
            }
        }
    }

    /// The value read back from the Kempston I/O port.
    #[inline]
    pub fn port_read(&self) -> u8 {
        (self.kbd_mask | self.ext_mask).bits()
    }

    /// Routes a reserved key press either to the Kempston state or to the
    /// Sinclair digit keys. Returns `false` if the code was not taken and
    /// should go to the keyboard matrix instead.
    pub fn key_down(&mut self, kbd: &mut KeyboardMatrix, code: u8) -> bool {
        match self.mode {
            JoystickMode::None => false,
            JoystickMode::Kempston => match kempston_bit(code) {
                Some(bit) => {
                    self.kbd_mask.insert(bit);
                    true
                }
                None => false
            },
            _ => match self.mode.sinclair_key(code) {
                Some(key) => {
                    kbd.key_down(key);
                    true
                }
                None => false
            }
        }
    }

    /// The release counterpart of [JoystickPort::key_down].
    pub fn key_up(&mut self, kbd: &mut KeyboardMatrix, code: u8) -> bool {
        match self.mode {
            JoystickMode::None => false,
            JoystickMode::Kempston => match kempston_bit(code) {
                Some(bit) => {
                    self.kbd_mask.remove(bit);
                    true
                }
                None => false
            },
            _ => match self.mode.sinclair_key(code) {
                Some(key) => {
                    kbd.key_up(key);
                    true
                }
                None => false
            }
        }
    }

    /// Applies a whole host gamepad state at once.
    ///
    /// In Kempston mode the mask is latched for the port to read back; in
    /// the Sinclair modes it is translated to digit key presses and
    /// releases. In [JoystickMode::None] the state is ignored.
    pub fn set_joystick(&mut self, kbd: &mut KeyboardMatrix, mask: JoystickMask) {
        match self.mode {
            JoystickMode::None => {}
            JoystickMode::Kempston => {
                self.ext_mask = mask;
            }
            _ => {
                for (bit, code) in [
                    (JoystickMask::LEFT, KEY_JOY_LEFT),
                    (JoystickMask::RIGHT, KEY_JOY_RIGHT),
                    (JoystickMask::DOWN, KEY_JOY_DOWN),
                    (JoystickMask::UP, KEY_JOY_UP),
                    (JoystickMask::FIRE, KEY_JOY_FIRE)
                ].iter().copied() {
                    if let Some(key) = self.mode.sinclair_key(code) {
                        if mask.contains(bit) {
                            kbd.key_down(key);
                        }
                        else {
                            kbd.key_up(key);
                        }
                    }
                }
            }
        }
    }
}
