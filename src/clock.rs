//! Emulator clock helpers.

/// The CPU clock frequency of the ZX Spectrum 48K, in Hz.
pub const CPU_CLOCK_HZ: u32 = 3_500_000;

/// Converts a wall-clock duration in microseconds to a whole number of clock
/// ticks at the given frequency, rounding down.
#[inline]
pub fn duration_to_ticks(freq_hz: u32, micro_seconds: u32) -> u32 {
    (u64::from(freq_hz) * u64::from(micro_seconds) / 1_000_000) as u32
}
