//! Video geometry, the palette and the scanline decoder.
use core::convert::TryFrom;
use core::fmt;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use bitflags::bitflags;

use crate::bus::TickCpu;
use crate::chip::Spectrum48;
use crate::memory::SCREEN_SIZE;

/// The width of the visible display area, in pixels.
pub const DISPLAY_WIDTH: usize = 320;
/// The height of the visible display area, in pixels.
pub const DISPLAY_HEIGHT: usize = 256;
/// The width of one frame buffer line, in bytes. Pixels are packed two to
/// a byte, the even pixel in the high nibble.
pub const FRAME_BUFFER_PITCH: usize = DISPLAY_WIDTH / 2;
/// The size of the whole frame buffer, in bytes.
pub const FRAME_BUFFER_SIZE: usize = FRAME_BUFFER_PITCH * DISPLAY_HEIGHT;
/// The number of pixel lines decoded from bitmap memory.
pub const BITMAP_LINES: usize = 192;
/// The number of border pixel lines above and below the bitmap area.
pub const BORDER_LINES: usize = (DISPLAY_HEIGHT - BITMAP_LINES) / 2;
/// The number of attribute cells per bitmap line.
pub const BITMAP_COLUMNS: usize = 32;
/// Frame buffer bytes taken by the border on each side of a bitmap line.
const SIDE_BORDER_BYTES: usize = (FRAME_BUFFER_PITCH - BITMAP_COLUMNS * 4) / 2;
/// The offset of the attribute cells inside video memory.
pub const ATTRS_OFFSET: u16 = 0x1800;

/// The palette of the ZX Spectrum, as 0xAABBGGRR pixels: the 8 base colors
/// followed by their BRIGHT variants. Attribute ink and paper values index
/// it directly, with bit 3 set for BRIGHT.
pub const PALETTE: [u32; 16] = [
    0xFF00_0000,    // black
    0xFFD7_0000,    // blue
    0xFF00_00D7,    // red
    0xFFD7_00D7,    // magenta
    0xFF00_D700,    // green
    0xFFD7_D700,    // cyan
    0xFF00_D7D7,    // yellow
    0xFFD7_D7D7,    // white
    0xFF00_0000,    // bright black
    0xFFFF_0000,    // bright blue
    0xFF00_00FF,    // bright red
    0xFFFF_00FF,    // bright magenta
    0xFF00_FF00,    // bright green
    0xFFFF_FF00,    // bright cyan
    0xFF00_FFFF,    // bright yellow
    0xFFFF_FFFF,    // bright white
];

/// The attribute FLASH phase flips every 16 frames.
pub(crate) const BLINK_PHASE_MASK: u8 = 0x08;

/// A whole frame of packed 4-bit pixels.
pub type FrameBuffer = [u8; FRAME_BUFFER_SIZE];

bitflags! {
    /// This type represents the border color.
    #[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
    #[cfg_attr(feature = "snapshot", serde(try_from = "u8", into = "u8"))]
    #[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BorderColor: u8 {
        const BLACK   = 0b000;
        const BLUE    = 0b001;
        const RED     = 0b010;
        const MAGENTA = 0b011;
        const GREEN   = 0b100;
        const CYAN    = 0b101;
        const YELLOW  = 0b110;
        const WHITE   = 0b111;
    }
}

/// The error type returned when a border color conversion failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TryFromU8BorderColorError(pub u8);

impl fmt::Display for TryFromU8BorderColorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "converted integer ({}) out of range for `BorderColor`", self.0)
    }
}

impl std::error::Error for TryFromU8BorderColorError {}

impl TryFrom<u8> for BorderColor {
    type Error = TryFromU8BorderColorError;
    fn try_from(color: u8) -> Result<Self, Self::Error> {
        BorderColor::from_bits(color).ok_or(TryFromU8BorderColorError(color))
    }
}

impl From<BorderColor> for u8 {
    fn from(color: BorderColor) -> u8 {
        color.bits()
    }
}

/// Static properties a display driver needs to present frames: the frame
/// buffer geometry and the palette its nibbles index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayInfo {
    /// The width of a frame buffer line, in bytes.
    pub frame_pitch: usize,
    /// The number of frame buffer lines.
    pub frame_lines: usize,
    /// The width of the display area, in pixels.
    pub display_width: usize,
    /// The height of the display area, in pixels.
    pub display_height: usize,
    pub palette: [u32; 16]
}

/// Returns an offset into the INK/PAPER bitmap memory of the given bitmap
/// line, with the hardware interleave of the line number bits.
#[inline(always)]
pub fn pixel_line_offset(line: u16) -> u16 {
    (line & 0b0000_0111) << 8 |
    (line & 0b0011_1000) << 2 |
    (line & 0b1100_0000) << 5
}

/// Returns an offset into the attribute cells of the given bitmap line.
#[inline(always)]
pub fn color_line_offset(line: u16) -> u16 {
    (line >> 3) << 5
}

impl<C: TickCpu> Spectrum48<C> {
    /// Decodes the video line at the current raster position into the frame
    /// buffer, advances the position and returns `true` on frame wrap.
    pub(crate) fn decode_scanline(&mut self) -> bool {
        let top_decode_line = i32::from(self.top_border_scanlines) - BORDER_LINES as i32;
        let y = i32::from(self.scanline) - top_decode_line;
        if (0..DISPLAY_HEIGHT as i32).contains(&y) {
            self.decode_line(y as usize);
        }
        self.scanline += 1;
        if self.scanline >= self.frame_scan_lines {
            self.scanline = 0;
            self.blink_counter = self.blink_counter.wrapping_add(1);
            return true;
        }
        false
    }

    fn decode_line(&mut self, y: usize) {
        let border = self.border.bits();
        let border_pair = border << 4 | border;
        let line = &mut self.frame_buffer[y * FRAME_BUFFER_PITCH..][..FRAME_BUFFER_PITCH];
        if !(BORDER_LINES..BORDER_LINES + BITMAP_LINES).contains(&y) {
            for pair in line.iter_mut() {
                *pair = border_pair;
            }
            return;
        }
        for pair in line[..SIDE_BORDER_BYTES].iter_mut() {
            *pair = border_pair;
        }
        for pair in line[FRAME_BUFFER_PITCH - SIDE_BORDER_BYTES..].iter_mut() {
            *pair = border_pair;
        }
        let bitmap_line = (y - BORDER_LINES) as u16;
        let blink = self.blink_counter & BLINK_PHASE_MASK != 0;
        let screen = &self.memory.screen_ref()[..SCREEN_SIZE];
        let bitmap_offset = pixel_line_offset(bitmap_line) as usize;
        let attrs_offset = (ATTRS_OFFSET + color_line_offset(bitmap_line)) as usize;
        let out = &mut line[SIDE_BORDER_BYTES..FRAME_BUFFER_PITCH - SIDE_BORDER_BYTES];
        for col in 0..BITMAP_COLUMNS {
            let bitmap = screen[bitmap_offset + col];
            let attr = screen[attrs_offset + col];
            let mut ink = attr & 0b111;
            let mut paper = (attr >> 3) & 0b111;
            if blink && attr & 0x80 != 0 {
                core::mem::swap(&mut ink, &mut paper);
            }
            // BRIGHT selects the upper palette half
            let bright = (attr & 0x40) >> 3;
            let ink = ink | bright;
            let paper = paper | bright;
            for (index, pair) in out[col * 4..col * 4 + 4].iter_mut().enumerate() {
                let hi = if bitmap & (0x80 >> (index * 2)) != 0 { ink } else { paper };
                let lo = if bitmap & (0x40 >> (index * 2)) != 0 { ink } else { paper };
                *pair = hi << 4 | lo;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_line_offsets_interleave() {
        assert_eq!(pixel_line_offset(0), 0);
        assert_eq!(pixel_line_offset(1), 0x100);
        assert_eq!(pixel_line_offset(7), 0x700);
        assert_eq!(pixel_line_offset(8), 0x20);
        assert_eq!(pixel_line_offset(9), 0x120);
        assert_eq!(pixel_line_offset(63), 0x7E0);
        assert_eq!(pixel_line_offset(64), 0x800);
        assert_eq!(pixel_line_offset(128), 0x1000);
        assert_eq!(pixel_line_offset(191), 0x17E0);
    }

    #[test]
    fn color_line_offsets_are_linear_per_cell_row() {
        assert_eq!(color_line_offset(0), 0);
        assert_eq!(color_line_offset(7), 0);
        assert_eq!(color_line_offset(8), 32);
        assert_eq!(color_line_offset(100), 384);
        assert_eq!(color_line_offset(191), 736);
    }

    #[test]
    fn border_color_conversions() {
        let color = BorderColor::try_from(5).unwrap();
        assert_eq!(color, BorderColor::CYAN);
        assert_eq!(u8::from(color), 5);
        assert_eq!(BorderColor::try_from(8).unwrap_err(), TryFromU8BorderColorError(8));
        assert_eq!(BorderColor::default(), BorderColor::BLACK);
    }

    #[test]
    fn palette_brightness_halves() {
        for (dim, bright) in PALETTE[1..8].iter().zip(PALETTE[9..].iter()) {
            assert_eq!(dim & 0xFF00_0000, 0xFF00_0000);
            assert_eq!(bright & 0x00FF_FFFF, (dim & 0x00FF_FFFF) / 0xD7 * 0xFF);
        }
    }
}
