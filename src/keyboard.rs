/*
    Copyright (C) 2026  the zx48 authors

    This file is part of zx48, a ZX Spectrum emulation library.

    For the full copyright notice, see the lib.rs file.
*/
//! The 8x5 keyboard matrix of the ZX Spectrum.
//!
//! Each of the 8 half-rows exposes 5 key lines. A half-row is selected for
//! reading by pulling its address line low; reading several half-rows at
//! once wire-ORs their key lines together.
//!
//! Keys are identified by key codes: printable characters map through the
//! layered keymap below and a handful of control codes map to composed
//! keys such as the cursors, which hold CAPS SHIFT together with a digit.
#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

/// The number of keyboard half-rows.
pub const NUM_ROWS: usize = 8;
/// The number of key lines per half-row.
pub const NUM_LINES: usize = 5;
/// The key code of the ENTER key.
pub const KEY_ENTER: u8 = 0x0D;
/// The key code of the SYMBOL SHIFT key.
pub const KEY_SYMBOL_SHIFT: u8 = 0x0F;
/// The key code of the composed EDIT key (CAPS SHIFT + 1).
pub const KEY_EDIT: u8 = 0x07;
/// The key code of the composed DELETE key (CAPS SHIFT + 0).
pub const KEY_DELETE: u8 = 0x0C;

const MOD_CAPS: u8 = 1;
const MOD_SYMBOL: u8 = 2;

/// The matrix position a key code resolves to, together with the shift
/// modifier held along with it.
#[derive(Clone, Copy)]
struct KeyPos {
    row: u8,
    line: u8,
    mods: u8
}

const NO_KEY: KeyPos = KeyPos { row: 0xFF, line: 0, mods: 0 };

/// Three layers of the printable keymap, 8 half-rows of 5 key codes each:
/// unshifted, CAPS-shifted and SYMBOL-shifted. A space marks an unmapped
/// slot; the SPACE key itself is registered separately.
const KEYMAP_LAYERS: [&[u8; NUM_ROWS * NUM_LINES]; 3] = [
    b" zxcvasdfgqwert1234509876poiuy lkjh  mnb",
    b" ZXCVASDFGQWERT          POIUY LKJH  MNB",
    b" : ?/        <>!@#$%_)('&\";    =+-^  .,*",
];

const fn build_keymap() -> [KeyPos; 256] {
    let mut map = [NO_KEY; 256];
    let mut layer = 0;
    while layer < KEYMAP_LAYERS.len() {
        let mods = match layer {
            0 => 0,
            1 => MOD_CAPS,
            _ => MOD_SYMBOL
        };
        let keys = KEYMAP_LAYERS[layer];
        let mut index = 0;
        while index < keys.len() {
            let code = keys[index];
            if code != b' ' {
                map[code as usize] = KeyPos {
                    row: (index / NUM_LINES) as u8,
                    line: (index % NUM_LINES) as u8,
                    mods
                };
            }
            index += 1;
        }
        layer += 1;
    }
    // keys the layer table cannot express
    map[b' ' as usize] = KeyPos { row: 7, line: 0, mods: 0 };
    map[KEY_ENTER as usize] = KeyPos { row: 6, line: 0, mods: 0 };
    map[KEY_SYMBOL_SHIFT as usize] = KeyPos { row: 7, line: 1, mods: 0 };
    // cursor left: CAPS SHIFT + 5
    map[0x08] = KeyPos { row: 3, line: 4, mods: MOD_CAPS };
    // cursor right: CAPS SHIFT + 8
    map[0x09] = KeyPos { row: 4, line: 2, mods: MOD_CAPS };
    // cursor down: CAPS SHIFT + 6
    map[0x0A] = KeyPos { row: 4, line: 4, mods: MOD_CAPS };
    // cursor up: CAPS SHIFT + 7
    map[0x0B] = KeyPos { row: 4, line: 3, mods: MOD_CAPS };
    map[KEY_EDIT as usize] = KeyPos { row: 3, line: 0, mods: MOD_CAPS };
    map[KEY_DELETE as usize] = KeyPos { row: 4, line: 0, mods: MOD_CAPS };
    map
}

static KEYMAP: [KeyPos; 256] = build_keymap();

/// The state of the keyboard matrix.
///
/// The set of held key codes is retained next to the derived matrix rows,
/// so releasing a key never takes down a line that another held key or a
/// composed key's modifier still drives.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct KeyboardMatrix {
    pressed: [u64; 4],
    rows: [u8; NUM_ROWS]
}

impl KeyboardMatrix {
    pub fn new() -> KeyboardMatrix {
        KeyboardMatrix::default()
    }

    /// Marks the key with the given code as held down.
    ///
    /// Codes that map to no key are ignored.
    pub fn key_down(&mut self, code: u8) {
        self.pressed[code as usize / 64] |= 1 << (code % 64);
        self.rebuild();
    }

    /// Marks the key with the given code as released.
    pub fn key_up(&mut self, code: u8) {
        self.pressed[code as usize / 64] &= !(1 << (code % 64));
        self.rebuild();
    }

    /// Releases all keys.
    pub fn clear(&mut self) {
        *self = KeyboardMatrix::default();
    }

    /// Returns `true` if the key with the given code is held down.
    pub fn is_key_down(&self, code: u8) -> bool {
        self.pressed[code as usize / 64] & (1 << (code % 64)) != 0
    }

    /// Returns the wire-OR of the key lines of every half-row selected in
    /// `row_mask`, as active-high bits 0 to 4.
    pub fn read_lines(&self, row_mask: u8) -> u8 {
        let mut lines = 0;
        for (row, &bits) in self.rows.iter().enumerate() {
            if row_mask & (1 << row) != 0 {
                lines |= bits;
            }
        }
        lines
    }

    fn rebuild(&mut self) {
        let mut rows = [0u8; NUM_ROWS];
        for (word, &held) in self.pressed.iter().enumerate() {
            let mut held = held;
            while held != 0 {
                let code = word * 64 + held.trailing_zeros() as usize;
                held &= held - 1;
                let pos = KEYMAP[code];
                if pos.row == NO_KEY.row {
                    continue;
                }
                rows[pos.row as usize] |= 1 << pos.line;
                if pos.mods & MOD_CAPS != 0 {
                    // CAPS SHIFT sits at half-row 0, line 0
                    rows[0] |= 1;
                }
                if pos.mods & MOD_SYMBOL != 0 {
                    // SYMBOL SHIFT sits at half-row 7, line 1
                    rows[7] |= 2;
                }
            }
        }
        self.rows = rows;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_keys_drive_their_lines() {
        let mut kbd = KeyboardMatrix::new();
        assert_eq!(kbd.read_lines(0xFF), 0);
        kbd.key_down(b'a');
        assert_eq!(kbd.read_lines(1 << 1), 0b00001);
        kbd.key_down(b'g');
        assert_eq!(kbd.read_lines(1 << 1), 0b10001);
        assert_eq!(kbd.read_lines(1 << 0), 0);
        kbd.key_up(b'a');
        assert_eq!(kbd.read_lines(1 << 1), 0b10000);
    }

    #[test]
    fn multiple_rows_wire_or() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_down(b'q');
        kbd.key_down(b'p');
        assert_eq!(kbd.read_lines(1 << 2), 0b00001);
        assert_eq!(kbd.read_lines(1 << 5), 0b00001);
        assert_eq!(kbd.read_lines(0b100100), 0b00001);
        assert_eq!(kbd.read_lines(0), 0);
    }

    #[test]
    fn shifted_characters_hold_the_modifier() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_down(b'A');
        assert_eq!(kbd.read_lines(1 << 1), 0b00001);
        assert_eq!(kbd.read_lines(1 << 0), 0b00001, "CAPS SHIFT must be down");
        kbd.key_up(b'A');
        assert_eq!(kbd.read_lines(0xFF), 0);

        kbd.key_down(b'*');
        assert_eq!(kbd.read_lines(1 << 7), 0b10010, "B with SYMBOL SHIFT");
        kbd.key_up(b'*');
        assert_eq!(kbd.read_lines(0xFF), 0);
    }

    #[test]
    fn cursor_keys_compose_caps_with_digits() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_down(0x08);
        assert_eq!(kbd.read_lines(1 << 3), 0b10000, "digit 5");
        assert_eq!(kbd.read_lines(1 << 0), 0b00001, "CAPS SHIFT");
        kbd.key_down(0x0B);
        assert_eq!(kbd.read_lines(1 << 4), 0b01000, "digit 7");
        kbd.key_up(0x08);
        // CAPS SHIFT stays down as long as any composed key is held
        assert_eq!(kbd.read_lines(1 << 0), 0b00001);
        assert_eq!(kbd.read_lines(1 << 3), 0);
        kbd.key_up(0x0B);
        assert_eq!(kbd.read_lines(0xFF), 0);
    }

    #[test]
    fn repeated_key_down_is_idempotent() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_down(b'z');
        kbd.key_down(b'z');
        assert_eq!(kbd.read_lines(1 << 0), 0b00010);
        kbd.key_up(b'z');
        assert_eq!(kbd.read_lines(0xFF), 0);
    }

    #[test]
    fn special_keys_map() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_down(b' ');
        kbd.key_down(KEY_ENTER);
        kbd.key_down(KEY_SYMBOL_SHIFT);
        assert_eq!(kbd.read_lines(1 << 7), 0b00011);
        assert_eq!(kbd.read_lines(1 << 6), 0b00001);
        kbd.clear();
        assert_eq!(kbd.read_lines(0xFF), 0);
        assert!(!kbd.is_key_down(b' '));
    }

    #[test]
    fn unmapped_codes_are_ignored() {
        let mut kbd = KeyboardMatrix::new();
        kbd.key_down(0x00);
        kbd.key_down(0x7F);
        kbd.key_down(0xF0);
        assert_eq!(kbd.read_lines(0xFF), 0);
    }
}
