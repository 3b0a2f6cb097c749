//! Scanning of a 4x4 key matrix from two periodic interrupts.
//!
//! The matrix has 4 column lines driven by the MCU and 4 row lines read back (pulled down).  A
//! key connects its column to its row, so a row reads high while the key is held down and its
//! column is the active one.
//!
//! Scanning is split across two alarms:
//!
//! - the [`ColumnDriver`] interrupt advances the [`ColumnPointer`] and makes the new column the
//!   only active one
//! - the [`RowSampler`] interrupt reads the rows for whatever column is active, compares them
//!   with its pressed-key table and emits a [`KeyEvent`] for every key that changed
//!
//! The two run off independent alarms whose firings are kept out of phase (see
//! [`KeypadTiming::in_phase`]), so a column has had time to settle electrically by the time its
//! rows are sampled.
//!
//! The column pointer is the only state the two interrupts share.  Only the column driver writes
//! it, and the sampler only loads it.  The pressed-key table is private to the sampler.

use portable_atomic::{AtomicU8, Ordering};
use strum::VariantArray;

use crate::config::{KeypadPins, KeypadTiming};
use crate::timing::{self, Alarm, Micros};
use crate::{DigitalLines, LineRange, Pull};

pub const COLUMNS: usize = 4;
pub const ROWS: usize = 4;
pub const KEYS: usize = COLUMNS * ROWS;

/// The columns in the key matrix, in scan order
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::VariantArray)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyColumn {
    C0,
    C1,
    C2,
    C3,
}

impl KeyColumn {
    /// Column for a counter value; the counter is taken modulo 4 so this is total.
    pub const fn from_index(index: u8) -> Self {
        match index % COLUMNS as u8 {
            0 => Self::C0,
            1 => Self::C1,
            2 => Self::C2,
            _ => Self::C3,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    /// The column after this one, wrapping back to [`Self::C0`]
    pub const fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }
}

/// The rows in the key matrix, in the order they appear in the row mask
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::VariantArray)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyRow {
    R0,
    R1,
    R2,
    R3,
}

impl KeyRow {
    pub const fn from_index(index: u8) -> Self {
        match index % ROWS as u8 {
            0 => Self::R0,
            1 => Self::R1,
            2 => Self::R2,
            _ => Self::R3,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Bit for this row in a 4-bit row mask
    pub const fn mask(self) -> u8 {
        1 << self.index()
    }
}

/// One key of the matrix, identified by its column and row
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyId {
    pub column: KeyColumn,
    pub row: KeyRow,
}

impl KeyId {
    pub const fn new(column: KeyColumn, row: KeyRow) -> Self {
        Self { column, row }
    }

    /// Position of this key in the keymap and in the pressed-key table: `4 * column + row`
    pub const fn index(self) -> usize {
        self.column.index() as usize * ROWS + self.row.index() as usize
    }
}

/// The character printed on each key, indexed by [`KeyId::index`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Keymap([u8; KEYS]);

impl Keymap {
    /// Legends of the 4x4 membrane keypad the panel ships with
    pub const REFERENCE: Self = Self(*b"DCBA#9630852*741");

    pub const fn new(chars: [u8; KEYS]) -> Self {
        Self(chars)
    }

    pub const fn char(&self, key: KeyId) -> u8 {
        self.0[key.index()]
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::REFERENCE
    }
}

/// A key changing state
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyEvent {
    /// The key's legend from the [`Keymap`]
    pub key: u8,
    pub pressed: bool,
}

impl KeyEvent {
    const PRESSED_FLAG: u16 = 1 << 8;

    pub const fn pressed(key: u8) -> Self {
        Self { key, pressed: true }
    }

    pub const fn released(key: u8) -> Self {
        Self {
            key,
            pressed: false,
        }
    }

    /// Pack into the 16-bit queue word used by the panel firmware: the character in the low byte,
    /// bit 8 set for a press.
    pub const fn code(self) -> u16 {
        if self.pressed {
            self.key as u16 | Self::PRESSED_FLAG
        } else {
            self.key as u16
        }
    }

    pub const fn from_code(code: u16) -> Self {
        Self {
            key: code as u8,
            pressed: code & Self::PRESSED_FLAG != 0,
        }
    }
}

/// Destination for key events, called from interrupt context.
///
/// Implementations must not block or allocate.  When there's no room the event is handed back and
/// the sampler drops it; what happens to the consumer's view of the keypad after that is the
/// consumer's problem.
pub trait KeySink {
    fn push(&mut self, event: KeyEvent) -> Result<(), KeyEvent>;
}

impl<'q, const N: usize> KeySink for heapless::spsc::Producer<'q, KeyEvent, N> {
    fn push(&mut self, event: KeyEvent) -> Result<(), KeyEvent> {
        self.enqueue(event)
    }
}

#[cfg(feature = "embassy-sync")]
impl<'c, M: embassy_sync::blocking_mutex::raw::RawMutex, const N: usize> KeySink
    for &'c embassy_sync::channel::Channel<M, KeyEvent, N>
{
    fn push(&mut self, event: KeyEvent) -> Result<(), KeyEvent> {
        self.try_send(event).map_err(|err| match err {
            embassy_sync::channel::TrySendError::Full(event) => event,
        })
    }
}

/// The column currently being driven.
///
/// Written only by the [`ColumnDriver`], read by the [`RowSampler`].
pub struct ColumnPointer(AtomicU8);

impl ColumnPointer {
    /// Starts on the last column, so the first advance drives [`KeyColumn::C0`]
    pub const fn new() -> Self {
        Self(AtomicU8::new(COLUMNS as u8 - 1))
    }

    pub fn current(&self) -> KeyColumn {
        KeyColumn::from_index(self.0.load(Ordering::Acquire))
    }

    /// Single writer, so a plain load and store is enough; no read-modify-write needed.
    fn advance(&self) -> KeyColumn {
        let next = self.current().next();
        self.0.store(next.index(), Ordering::Release);
        next
    }
}

impl Default for ColumnPointer {
    fn default() -> Self {
        Self::new()
    }
}

/// Mask to XOR into the outputs so that `column` becomes the only active column.
///
/// `outputs & columns.mask()` is whatever column is active now; XORing it with the new column's
/// bit flips exactly the two lines that differ (or a single line if nothing was active yet) and
/// leaves every other line alone.
pub fn column_toggle_mask(outputs: u32, columns: LineRange, column: KeyColumn) -> u32 {
    (outputs & columns.mask()) ^ columns.bit(column.index())
}

/// State of the column-drive interrupt
pub struct ColumnDriver<'a, L, A> {
    column: &'a ColumnPointer,
    pins: LineRange,
    period: Micros,
    lines: L,
    alarm: A,
}

impl<'a, L: DigitalLines, A: Alarm> ColumnDriver<'a, L, A> {
    pub const fn new(
        column: &'a ColumnPointer,
        pins: LineRange,
        period: Micros,
        lines: L,
        alarm: A,
    ) -> Self {
        Self {
            column,
            pins,
            period,
            lines,
            alarm,
        }
    }

    /// Body of the column-drive interrupt: move on to the next column and re-arm.
    pub fn on_interrupt(&mut self) {
        self.alarm.acknowledge();

        let column = self.column.advance();
        let toggle = column_toggle_mask(self.lines.outputs(), self.pins, column);
        self.lines.toggle(toggle);

        self.alarm.schedule_next(self.period);
    }
}

/// The debounced "is this key down" table.
///
/// A key is reported once when it goes down and once when it comes back up.  Holding a key across
/// any number of samples reports nothing further.
pub struct Debouncer {
    pressed: [bool; KEYS],
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            pressed: [false; KEYS],
        }
    }

    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.pressed[key.index()]
    }

    /// Apply one sample of the 4-bit `rows` mask taken while `column` was active.
    ///
    /// `on_change` is called for every key of that column whose state changed, in ascending row
    /// order, with `true` for a press.
    pub fn update(&mut self, column: KeyColumn, rows: u8, mut on_change: impl FnMut(KeyId, bool)) {
        for row in KeyRow::VARIANTS {
            let key = KeyId::new(column, *row);
            let down = rows & row.mask() != 0;
            let state = &mut self.pressed[key.index()];

            if down != *state {
                *state = down;
                on_change(key, down);
            }
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// State of the row-sample interrupt.  Owns the pressed-key table.
pub struct RowSampler<'a, L, A, S> {
    column: &'a ColumnPointer,
    debouncer: Debouncer,
    keymap: Keymap,
    pins: LineRange,
    period: Micros,
    lines: L,
    alarm: A,
    sink: S,
    dropped: u32,
}

impl<'a, L: DigitalLines, A: Alarm, S: KeySink> RowSampler<'a, L, A, S> {
    pub const fn new(
        column: &'a ColumnPointer,
        keymap: Keymap,
        pins: LineRange,
        period: Micros,
        lines: L,
        alarm: A,
        sink: S,
    ) -> Self {
        Self {
            column,
            debouncer: Debouncer::new(),
            keymap,
            pins,
            period,
            lines,
            alarm,
            sink,
            dropped: 0,
        }
    }

    /// Body of the row-sample interrupt: diff the active column's rows against the pressed-key
    /// table, emit events, and re-arm once.
    pub fn on_interrupt(&mut self) {
        self.alarm.acknowledge();

        let rows = self.pins.extract(self.lines.inputs()) as u8;
        let column = self.column.current();

        let keymap = &self.keymap;
        let sink = &mut self.sink;
        let dropped = &mut self.dropped;

        self.debouncer.update(column, rows, |key, pressed| {
            let event = KeyEvent {
                key: keymap.char(key),
                pressed,
            };

            #[cfg(feature = "defmt")]
            defmt::trace!("{} -> {}", key, event);

            if let Err(_event) = sink.push(event) {
                *dropped = dropped.wrapping_add(1);

                #[cfg(feature = "defmt")]
                defmt::warn!("key queue full, dropped {}", _event);
            }
        });

        self.alarm.schedule_next(self.period);
    }

    /// Debounced state of a key
    pub fn is_pressed(&self, key: KeyId) -> bool {
        self.debouncer.is_pressed(key)
    }

    /// Number of events the sink refused since startup
    pub fn dropped_events(&self) -> u32 {
        self.dropped
    }
}

/// Take ownership of the row (input, pulled down) and column (output, driven low) lines.
pub fn initialize_pins<L: DigitalLines>(lines: &mut L, pins: &KeypadPins) {
    for pin in pins.rows.pins() {
        lines.configure_input(pin, Pull::Down);
    }

    for pin in pins.columns.pins() {
        lines.configure_output(pin);
    }
}

/// Start both keypad timers.  Their vectors must already be bound to a [`ColumnDriver`] and a
/// [`RowSampler`] respectively.
pub fn start_scan<C: Alarm, R: Alarm>(
    column_alarm: &mut C,
    sample_alarm: &mut R,
    timing: &KeypadTiming,
) {
    timing::start_periodic(column_alarm, timing.first_column);
    timing::start_periodic(sample_alarm, timing.first_sample);
}
