//! Module describing the [`DigitalLines`] trait through which every subsystem touches GPIO, and
//! the [`LineRange`] helper used to map a contiguous run of lines onto bits of the flat GPIO
//! registers.

/// This trait represents the low-level digital line registers of the target microcontroller.
///
/// Every output operation takes a bitmask over the whole bank and must be atomic with respect
/// to the other bits in the bank.  On the RP2040 that's exactly what the SIO `GPIO_OUT_SET`,
/// `GPIO_OUT_CLR` and `GPIO_OUT_XOR` aliases provide, which is what makes it safe for the
/// display and keypad interrupts to drive their (disjoint) lines without any locking.
///
/// Implementations are expected to be cheap to construct and copy; the RP2040 implementation is
/// a zero-sized handle, and each interrupt handler owns its own instance.
pub trait DigitalLines {
    /// Drive every line whose bit is set in `mask` high
    fn set(&mut self, mask: u32);

    /// Drive every line whose bit is set in `mask` low
    fn clear(&mut self, mask: u32);

    /// Invert the output level of every line whose bit is set in `mask`
    fn toggle(&mut self, mask: u32);

    /// Current value of the output register
    fn outputs(&self) -> u32;

    /// Current value of the input register
    fn inputs(&self) -> u32;

    /// Hand the pad over to software control as a push-pull output driven low.
    ///
    /// That means: enable the output driver, drive the line low, disable the input buffer,
    /// select the SIO function and finally remove pad isolation, in that order, so the line never
    /// glitches high while ownership changes hands.
    fn configure_output(&mut self, pin: u8);

    /// Configure the pad as a digital input with the given pull resistor.
    fn configure_input(&mut self, pin: u8, pull: Pull);
}

/// Pull resistor configuration for an input pad
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

/// A contiguous run of `count` digital lines starting at line `first`.
///
/// Bit `i` of a value produced by [`Self::extract`] (or consumed by [`Self::place`]) corresponds
/// to line `first + i`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineRange {
    pub first: u8,
    pub count: u8,
}

impl LineRange {
    pub const fn new(first: u8, count: u8) -> Self {
        Self { first, count }
    }

    /// One past the last line in the range
    pub const fn end(&self) -> u8 {
        self.first + self.count
    }

    /// Mask over the bank with a bit set for every line in this range
    pub const fn mask(&self) -> u32 {
        (((1u64 << self.count) - 1) << self.first) as u32
    }

    /// Mask over the bank for the `index`-th line of this range
    pub const fn bit(&self, index: u8) -> u32 {
        1 << (self.first + index)
    }

    /// Pull this range's bits out of a full register value, right-aligned
    pub const fn extract(&self, register: u32) -> u32 {
        (register & self.mask()) >> self.first
    }

    /// Shift right-aligned `bits` into position for this range.  Bits that don't fit are dropped.
    pub const fn place(&self, bits: u32) -> u32 {
        (bits << self.first) & self.mask()
    }

    pub const fn contains(&self, pin: u8) -> bool {
        pin >= self.first && pin < self.end()
    }

    pub const fn overlaps(&self, other: &LineRange) -> bool {
        self.first < other.end() && other.first < self.end()
    }

    /// Iterate over the line numbers in this range, lowest first
    pub fn pins(&self) -> core::ops::Range<u8> {
        self.first..self.end()
    }
}
