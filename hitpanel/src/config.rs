//! Pin assignments and timer periods.
//!
//! Everything here is plain `const`-constructible data so it can be used to build the interrupt
//! handler state in `static`s.  The `REFERENCE` constants describe the panel as wired on the Pi
//! Pico carrier board.

use core::fmt;

use crate::keypad::{COLUMNS, ROWS};
use crate::timing::Micros;
use crate::LineRange;

/// Number of GPIO lines in the user bank
pub const BANK_LINES: u8 = 30;

/// Lines used by the multiplexed display
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayPins {
    /// Segments A-G then the decimal point, one line each
    pub segments: LineRange,
    /// Binary number of the lit digit, least significant bit first
    pub select: LineRange,
}

impl DisplayPins {
    pub const SEGMENT_LINES: u8 = 8;
    pub const SELECT_LINES: u8 = 3;

    pub const REFERENCE: Self = Self {
        segments: LineRange::new(10, Self::SEGMENT_LINES),
        select: LineRange::new(18, Self::SELECT_LINES),
    };

    /// Every line the display drives
    pub const fn mask(&self) -> u32 {
        self.segments.mask() | self.select.mask()
    }
}

/// Lines used by the key matrix
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeypadPins {
    pub rows: LineRange,
    pub columns: LineRange,
}

impl KeypadPins {
    pub const REFERENCE: Self = Self {
        rows: LineRange::new(2, ROWS as u8),
        columns: LineRange::new(6, COLUMNS as u8),
    };
}

/// Lines used by the hit sensor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HitPins {
    pub hit: u8,
    pub trigger: u8,
}

impl HitPins {
    pub const REFERENCE: Self = Self {
        hit: 21,
        trigger: 22,
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayTiming {
    /// Delay from starting the refresh until the first digit is lit
    pub first_refresh: Micros,
    /// Time each digit stays lit
    pub period: Micros,
}

impl DisplayTiming {
    pub const REFERENCE: Self = Self {
        first_refresh: Micros::from_millis(3),
        period: Micros::from_millis(3),
    };
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeypadTiming {
    pub first_column: Micros,
    pub column_period: Micros,
    /// Must be out of phase with the column switches so rows are never sampled right as a column
    /// changes; see [`Self::in_phase`]
    pub first_sample: Micros,
    pub sample_period: Micros,
}

impl KeypadTiming {
    pub const REFERENCE: Self = Self {
        first_column: Micros::from_millis(1_000),
        column_period: Micros::from_millis(25),
        // Half a period after a column switch
        first_sample: Micros::from_micros(1_112_500),
        sample_period: Micros::from_millis(25),
    };

    /// Whether some row sample lands on the same counter value as some column switch.
    ///
    /// Column switches happen at `first_column + i * column_period` and samples at
    /// `first_sample + j * sample_period`; the two sequences meet iff the offset between their
    /// first firings is a multiple of the gcd of the periods.
    pub const fn in_phase(&self) -> bool {
        let offset = self.first_sample.ticks().abs_diff(self.first_column.ticks());

        match gcd(self.column_period.ticks(), self.sample_period.ticks()) {
            0 => offset == 0,
            step => offset % step == 0,
        }
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }

    a
}

/// Complete description of the panel hardware
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PanelConfig {
    pub display: DisplayPins,
    pub keypad: KeypadPins,
    pub hit: HitPins,
    pub display_timing: DisplayTiming,
    pub keypad_timing: KeypadTiming,
}

impl PanelConfig {
    pub const REFERENCE: Self = Self {
        display: DisplayPins::REFERENCE,
        keypad: KeypadPins::REFERENCE,
        hit: HitPins::REFERENCE,
        display_timing: DisplayTiming::REFERENCE,
        keypad_timing: KeypadTiming::REFERENCE,
    };

    /// Check the wiring is something the handlers can drive safely.
    ///
    /// The handlers write their lines with unsynchronized set/clear/toggle masks, which is only
    /// sound if no two subsystems share a line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ranges = [
            (LineGroup::KeypadRows, self.keypad.rows, ROWS as u8),
            (LineGroup::KeypadColumns, self.keypad.columns, COLUMNS as u8),
            (
                LineGroup::DisplaySegments,
                self.display.segments,
                DisplayPins::SEGMENT_LINES,
            ),
            (
                LineGroup::DisplaySelect,
                self.display.select,
                DisplayPins::SELECT_LINES,
            ),
            (LineGroup::HitLine, LineRange::new(self.hit.hit, 1), 1),
            (LineGroup::TriggerLine, LineRange::new(self.hit.trigger, 1), 1),
        ];

        for (group, range, width) in ranges {
            if range.count != width {
                return Err(ConfigError::WrongWidth {
                    group,
                    expected: width,
                    actual: range.count,
                });
            }

            if range.end() > BANK_LINES {
                return Err(ConfigError::OutOfRange { group });
            }
        }

        for (index, (first, a, _)) in ranges.iter().enumerate() {
            for (second, b, _) in &ranges[index + 1..] {
                if a.overlaps(b) {
                    return Err(ConfigError::Overlap {
                        first: *first,
                        second: *second,
                    });
                }
            }
        }

        let timing = &self.keypad_timing;
        if timing.column_period.ticks() == 0 || timing.sample_period.ticks() == 0 {
            return Err(ConfigError::ZeroPeriod);
        }

        if timing.in_phase() {
            return Err(ConfigError::UnstaggeredScan);
        }

        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// The groups of lines in a [`PanelConfig`], for error reporting
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineGroup {
    KeypadRows,
    KeypadColumns,
    DisplaySegments,
    DisplaySelect,
    HitLine,
    TriggerLine,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Two groups share at least one line
    Overlap { first: LineGroup, second: LineGroup },
    /// A group extends past the end of the GPIO bank
    OutOfRange { group: LineGroup },
    /// A group has the wrong number of lines
    WrongWidth {
        group: LineGroup,
        expected: u8,
        actual: u8,
    },
    /// A keypad timer has a zero period
    ZeroPeriod,
    /// Rows would be sampled at the same moment a column is switched
    UnstaggeredScan,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Overlap { first, second } => write!(
                f,
                "{} and {} share a line",
                <&str>::from(first),
                <&str>::from(second)
            ),
            Self::OutOfRange { group } => {
                write!(f, "{} runs past GPIO{}", <&str>::from(group), BANK_LINES - 1)
            }
            Self::WrongWidth {
                group,
                expected,
                actual,
            } => write!(
                f,
                "{} needs {expected} lines, got {actual}",
                <&str>::from(group)
            ),
            Self::ZeroPeriod => f.write_str("keypad timer period is zero"),
            Self::UnstaggeredScan => f.write_str("keypad rows sampled as a column switches"),
        }
    }
}
