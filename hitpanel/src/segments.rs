/// The segment pattern for one digit of a seven-segment display.
///
/// The least significant 7 bits correspond to segments A through G and the most significant bit
/// corresponds to the `.` in the bottom right of the digit.  On the panel these 8 bits map one to
/// one onto the 8 segment-drive lines.
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segments(u8);

impl Segments {
    /// Nothing lit
    pub const BLANK: Self = Self(0);

    const GLYPH_MASK: u8 = 0b0111_1111;
    const DECIMAL_POINT: u8 = 0b1000_0000;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Build a pattern from glyph segments only; a decimal point bit in `glyph` is discarded.
    pub const fn from_glyph(glyph: u8) -> Self {
        Self(glyph & Self::GLYPH_MASK)
    }

    /// All 8 bits, in segment-drive line order
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Segments A-G without the decimal point
    pub const fn glyph(self) -> u8 {
        self.0 & Self::GLYPH_MASK
    }

    pub const fn has_decimal_point(self) -> bool {
        self.0 & Self::DECIMAL_POINT != 0
    }

    #[must_use]
    pub const fn with_decimal_point(self, on: bool) -> Self {
        if on {
            Self(self.0 | Self::DECIMAL_POINT)
        } else {
            Self(self.0 & Self::GLYPH_MASK)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_point_is_independent_of_glyph() {
        let three = Segments::from_glyph(0x4F);
        assert!(!three.has_decimal_point());

        let dotted = three.with_decimal_point(true);
        assert!(dotted.has_decimal_point());
        assert_eq!(dotted.glyph(), 0x4F);
        assert_eq!(dotted.bits(), 0xCF);

        assert_eq!(dotted.with_decimal_point(false), three);
    }

    #[test]
    fn from_glyph_strips_decimal_point() {
        assert_eq!(Segments::from_glyph(0xD3).bits(), 0x53);
        assert_eq!(Segments::from_bits(0xD3).bits(), 0xD3);
        assert_eq!(Segments::default(), Segments::BLANK);
    }
}
