//! Multiplexed 8-digit seven-segment display.
//!
//! All eight digits share the same 8 segment-drive lines (7 segments plus decimal point).  Three
//! more lines carry the binary number of the digit being driven into a 3-to-8 decoder, so only
//! one digit is ever lit at a time.  The [`Refresh`] interrupt walks the digits fast enough that
//! persistence of vision makes them all appear lit at once.
//!
//! The message lives in a [`DisplayBuffer`].  It's written from thread mode through [`Display`]
//! while the refresh interrupt may be reading it.  Each digit is an independent atomic byte, so a
//! refresh that lands in the middle of a `print` shows some digits from the old message and some
//! from the new one for at most one refresh period.  Callers that can't tolerate that must mask
//! the refresh interrupt around the `print` call.

use portable_atomic::{AtomicU8, Ordering};

use crate::config::{DisplayPins, DisplayTiming};
use crate::timing::{self, Alarm, Micros};
use crate::{DigitalLines, Segments};

/// Number of digits on the panel
pub const DIGITS: usize = 8;

/// The character that is merged into the previous digit instead of taking a digit of its own
pub const DECIMAL_POINT: u8 = b'.';

/// Bit in a 16-bit message code that requests the decimal point on that digit
pub const DECIMAL_POINT_FLAG: u16 = 1 << 8;

/// Maps a character code to its glyph
pub type Font = fn(u8) -> Segments;

/// The encoded message shown on the display, one [`Segments`] per digit, left-most digit first.
pub struct DisplayBuffer {
    digits: [AtomicU8; DIGITS],
}

impl DisplayBuffer {
    /// A buffer with every digit blank
    pub const fn new() -> Self {
        #[allow(clippy::declare_interior_mutable_const)]
        const BLANK: AtomicU8 = AtomicU8::new(0);

        Self {
            digits: [BLANK; DIGITS],
        }
    }

    /// Read one digit.  `index` must be less than [`DIGITS`].
    pub fn digit(&self, index: usize) -> Segments {
        Segments::from_bits(self.digits[index].load(Ordering::Relaxed))
    }

    /// Overwrite the whole buffer, left-most digit first
    pub fn store(&self, patterns: &[Segments; DIGITS]) {
        for (digit, pattern) in self.digits.iter().zip(patterns) {
            digit.store(pattern.bits(), Ordering::Relaxed);
        }
    }

    /// Read the whole buffer
    pub fn snapshot(&self) -> [Segments; DIGITS] {
        let mut patterns = [Segments::BLANK; DIGITS];
        for (pattern, digit) in patterns.iter_mut().zip(&self.digits) {
            *pattern = Segments::from_bits(digit.load(Ordering::Relaxed));
        }

        patterns
    }
}

impl Default for DisplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode 8 raw message codes.
///
/// The low byte of each code is the character; bit 8 ([`DECIMAL_POINT_FLAG`]) lights the
/// decimal point of that same digit.  Every code occupies exactly one digit.
pub fn encode_codes(message: &[u16; DIGITS], font: Font) -> [Segments; DIGITS] {
    let mut patterns = [Segments::BLANK; DIGITS];

    for (pattern, code) in patterns.iter_mut().zip(message) {
        let decimal_point = code & DECIMAL_POINT_FLAG != 0;
        *pattern = font(*code as u8).with_decimal_point(decimal_point);
    }

    patterns
}

/// Encode a line of text, folding each `.` into the digit before it.
///
/// Characters fill the digits left to right.  A `.` doesn't take a digit; it sets the decimal
/// point on the most recently written digit, which is why a `.` right after the eighth character
/// is still honoured.  A `.` with no digit before it is dropped.  Digits left over once the text
/// runs out are blank.
pub fn encode_text(text: &[u8], font: Font) -> [Segments; DIGITS] {
    let mut patterns = [Segments::BLANK; DIGITS];
    let mut len = 0;

    for &char in text {
        if char == DECIMAL_POINT {
            // Nothing to attach a leading '.' to
            if len > 0 {
                patterns[len - 1] = patterns[len - 1].with_decimal_point(true);
            }
            continue;
        }

        if len == DIGITS {
            break;
        }

        patterns[len] = font(char);
        len += 1;
    }

    patterns
}

/// Thread-mode writer for a [`DisplayBuffer`]
pub struct Display<'a> {
    buffer: &'a DisplayBuffer,
    font: Font,
}

impl<'a> Display<'a> {
    /// Render through the built-in ASCII font
    #[cfg(feature = "ascii-font")]
    pub fn new(buffer: &'a DisplayBuffer) -> Self {
        Self::with_font(buffer, crate::font::encode)
    }

    pub fn with_font(buffer: &'a DisplayBuffer, font: Font) -> Self {
        Self { buffer, font }
    }

    /// Replace the message with 8 raw codes; see [`encode_codes`]
    pub fn print(&self, message: &[u16; DIGITS]) {
        self.buffer.store(&encode_codes(message, self.font));
    }

    /// Replace the message with text, merging decimal points; see [`encode_text`]
    pub fn print_with_decimal(&self, text: &[u8]) {
        self.buffer.store(&encode_text(text, self.font));
    }

    pub fn print_str(&self, text: &str) {
        self.print_with_decimal(text.as_bytes());
    }

    pub fn clear(&self) {
        self.buffer.store(&[Segments::BLANK; DIGITS]);
    }
}

/// Take ownership of the segment and digit-select lines, leaving them all driven low.
pub fn initialize_pins<L: DigitalLines>(lines: &mut L, pins: &DisplayPins) {
    for pin in pins.segments.pins().chain(pins.select.pins()) {
        lines.configure_output(pin);
    }
}

/// Start the refresh timer.  The alarm's vector must already be bound to a [`Refresh`].
pub fn start_refresh<A: Alarm>(alarm: &mut A, timing: &DisplayTiming) {
    timing::start_periodic(alarm, timing.first_refresh);
}

/// Compute the `(clear, set)` masks that light `digit` with `pattern`.
///
/// `clear` covers every segment and select line so the previous digit goes dark before the next
/// one is lit.
pub fn drive_masks(pins: &DisplayPins, digit: u8, pattern: Segments) -> (u32, u32) {
    let set = pins.select.place(digit as u32) | pins.segments.place(pattern.bits() as u32);

    (pins.mask(), set)
}

/// State of the display refresh interrupt.
///
/// Owns the digit pointer; nothing else reads or writes it.
pub struct Refresh<'a, L, A> {
    buffer: &'a DisplayBuffer,
    pins: DisplayPins,
    period: Micros,
    lines: L,
    alarm: A,
    digit: u8,
}

impl<'a, L: DigitalLines, A: Alarm> Refresh<'a, L, A> {
    pub const fn new(
        buffer: &'a DisplayBuffer,
        pins: DisplayPins,
        period: Micros,
        lines: L,
        alarm: A,
    ) -> Self {
        Self {
            buffer,
            pins,
            period,
            lines,
            alarm,
            digit: 0,
        }
    }

    /// The digit that the next interrupt will light
    pub fn digit(&self) -> u8 {
        self.digit
    }

    /// Body of the refresh interrupt: light the next digit and re-arm.
    pub fn on_interrupt(&mut self) {
        self.alarm.acknowledge();

        let pattern = self.buffer.digit(self.digit as usize);
        let (clear, set) = drive_masks(&self.pins, self.digit, pattern);
        self.lines.clear(clear);
        self.lines.set(set);

        self.digit = (self.digit + 1) % DIGITS as u8;

        self.alarm.schedule_next(self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::encode;
    use crate::testing::{LineOp, MockAlarm, MockLines};
    use proptest::prelude::*;

    fn encoded(text: &[u8]) -> Vec<Segments> {
        text.iter().map(|c| encode(*c)).collect()
    }

    #[test]
    fn starts_blank() {
        assert_eq!(DisplayBuffer::new().snapshot(), [Segments::BLANK; DIGITS]);
    }

    #[test]
    fn print_codes_with_flags() {
        let buffer = DisplayBuffer::new();
        let display = Display::new(&buffer);

        let mut message = [0u16; DIGITS];
        for (code, char) in message.iter_mut().zip(b"12.34567") {
            *code = *char as u16;
        }
        message[3] |= DECIMAL_POINT_FLAG;
        display.print(&message);

        let digits = buffer.snapshot();
        for (index, digit) in digits.iter().enumerate() {
            assert_eq!(digit.has_decimal_point(), index == 3, "digit {index}");
        }
        assert_eq!(digits[3].glyph(), encode(b'3').glyph());
        // As a raw code a '.' is just another glyph-less character
        assert_eq!(digits[2], Segments::BLANK);
    }

    #[test]
    fn decimal_point_merges_into_previous_digit() {
        let patterns = encode_text(b"1234.5678", encode);

        let mut expected = [Segments::BLANK; DIGITS];
        expected.copy_from_slice(&encoded(b"12345678"));
        expected[3] = expected[3].with_decimal_point(true);

        assert_eq!(patterns, expected);
    }

    #[test]
    fn decimal_point_after_last_digit() {
        let patterns = encode_text(b"12345678.", encode);
        assert!(patterns[7].has_decimal_point());
        assert_eq!(patterns[7].glyph(), encode(b'8').glyph());
        assert!(patterns[..7].iter().all(|p| !p.has_decimal_point()));
    }

    #[test]
    fn leading_decimal_point_is_dropped() {
        let buffer = DisplayBuffer::new();
        let display = Display::new(&buffer);

        display.print_str("88888888");
        display.print_str(".1234567");

        let mut expected = [Segments::BLANK; DIGITS];
        expected[..7].copy_from_slice(&encoded(b"1234567"));

        // Index 0 holds the first real character, nothing stale and no decimal point
        assert_eq!(buffer.snapshot(), expected);
    }

    #[test]
    fn clear_blanks_every_digit() {
        let buffer = DisplayBuffer::new();
        let display = Display::new(&buffer);

        display.print_str("8.8.8.8.8.8.8.8.");
        assert!(buffer.snapshot().iter().all(|d| d.has_decimal_point()));

        display.clear();
        assert_eq!(buffer.snapshot(), [Segments::BLANK; DIGITS]);
    }

    #[test]
    fn short_text_blanks_the_rest() {
        let patterns = encode_text(b"HI", encode);
        assert_eq!(&patterns[..2], &encoded(b"HI")[..]);
        assert!(patterns[2..].iter().all(|p| *p == Segments::BLANK));
    }

    #[test]
    fn long_text_is_truncated() {
        let patterns = encode_text(b"0123456789", encode);
        assert_eq!(&patterns[..], &encoded(b"01234567")[..]);
    }

    #[test]
    fn custom_font() {
        fn all_lit(_: u8) -> Segments {
            Segments::from_glyph(0x7F)
        }

        let buffer = DisplayBuffer::new();
        Display::with_font(&buffer, all_lit).print_str("a.b");

        let digits = buffer.snapshot();
        assert_eq!(digits[0].bits(), 0xFF);
        assert_eq!(digits[1].bits(), 0x7F);
        assert_eq!(digits[2], Segments::BLANK);
    }

    #[test]
    fn initialize_pins_covers_segments_and_select() {
        let mut lines = MockLines::default();
        initialize_pins(&mut lines, &DisplayPins::REFERENCE);

        let pins: Vec<u8> = lines
            .ops
            .iter()
            .map(|op| match op {
                LineOp::Output(pin) => *pin,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(pins, (10..21).collect::<Vec<u8>>());
    }

    #[test]
    fn refresh_drives_one_digit_at_a_time() {
        let buffer = DisplayBuffer::new();
        Display::new(&buffer).print_str("0123.4567");

        let pins = DisplayPins::REFERENCE;
        let mut refresh = Refresh::new(
            &buffer,
            pins,
            Micros::from_millis(3),
            MockLines::default(),
            MockAlarm::at(500),
        );

        for digit in 0..DIGITS as u8 {
            refresh.on_interrupt();

            let out = refresh.lines.out;
            assert_eq!(pins.select.extract(out), digit as u32);
            assert_eq!(
                pins.segments.extract(out),
                buffer.digit(digit as usize).bits() as u32
            );
            // Lines outside the display are never touched
            assert_eq!(out & !pins.mask(), 0);
        }

        assert_eq!(refresh.alarm.acks, DIGITS);
        assert_eq!(refresh.alarm.arm_count, DIGITS);
        assert_eq!(refresh.alarm.armed, Some(3_500));

        // Each firing clears everything before lighting the next digit
        for pair in refresh.lines.ops.chunks(2) {
            assert_eq!(pair[0], LineOp::Clear(pins.mask()));
            assert!(matches!(pair[1], LineOp::Set(_)));
        }
    }

    #[test]
    fn digit_pointer_cycles() {
        let buffer = DisplayBuffer::new();
        let mut refresh = Refresh::new(
            &buffer,
            DisplayPins::REFERENCE,
            Micros::from_millis(3),
            MockLines::default(),
            MockAlarm::at(0),
        );

        let mut seen = Vec::new();
        for _ in 0..3 * DIGITS {
            seen.push(refresh.digit());
            refresh.on_interrupt();
        }

        let expected: Vec<u8> = (0..DIGITS as u8).cycle().take(3 * DIGITS).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn start_refresh_arms_first_firing() {
        let mut alarm = MockAlarm::at(10);
        start_refresh(&mut alarm, &DisplayTiming::REFERENCE);
        assert!(alarm.enabled);
        assert_eq!(alarm.armed, Some(3_010));
    }

    proptest! {
        #[test]
        fn text_without_points_encodes_each_char(text in proptest::collection::vec(0x20u8..0x7f, DIGITS)) {
            prop_assume!(!text.contains(&DECIMAL_POINT));

            let buffer = DisplayBuffer::new();
            Display::new(&buffer).print_with_decimal(&text);

            let digits = buffer.snapshot();
            prop_assert_eq!(&digits[..], &encoded(&text)[..]);
            prop_assert!(digits.iter().all(|d| !d.has_decimal_point()));
        }

        #[test]
        fn single_point_shifts_the_tail(text in proptest::collection::vec(b'0'..=b'9', DIGITS + 1), at in 1usize..DIGITS) {
            let mut text = text;
            text[at] = DECIMAL_POINT;

            let patterns = encode_text(&text, encode);

            let glyphs: Vec<u8> = text.iter().copied().filter(|c| *c != DECIMAL_POINT).collect();
            for (index, pattern) in patterns.iter().enumerate() {
                prop_assert_eq!(pattern.glyph(), encode(glyphs[index]).glyph());
                prop_assert_eq!(pattern.has_decimal_point(), index == at - 1);
            }
            // The last digit comes from the trailing character of the 9-character message
            prop_assert_eq!(patterns[DIGITS - 1].glyph(), encode(text[DIGITS]).glyph());
        }
    }
}
