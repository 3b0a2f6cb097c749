//! Interrupt-driven I/O for a small target-shooting panel: a 4x4 button matrix, an 8-digit
//! multiplexed seven-segment display and a trigger-gated hit sensor.
//!
//! There is no scheduler.  Each subsystem is a state machine whose `on_interrupt` method is
//! called from exactly one interrupt vector, and which re-arms its own hardware alarm before
//! returning.  Every piece of mutable state has a single writer:
//!
//! - the [`DisplayBuffer`] is written by [`Display`] (thread mode) and read by [`Refresh`]
//! - the [`ColumnPointer`] is written by [`ColumnDriver`] and read by [`RowSampler`]
//! - the pressed-key table lives inside [`RowSampler`] and nothing else can reach it
//! - the digit pointer lives inside [`Refresh`]
//!
//! Hardware is reached only through the traits in [`lines`] and [`timing`], so all of the logic
//! can be exercised on the host.  The `rp2040` feature provides the register-level
//! implementations for the Raspberry Pi RP2040.
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod display;
#[cfg(feature = "ascii-font")]
pub mod font;
pub mod hit;
pub mod keypad;
pub mod lines;
#[cfg(feature = "rp2040")]
pub mod rp2040;
mod segments;
pub mod timing;

#[cfg(test)]
mod testing;

pub use config::*;
pub use display::{Display, DisplayBuffer, Refresh};
pub use hit::{EdgeEvents, Hit, HitDetector, HitLine, HitSink, TriggerLine, TriggerReason};
pub use keypad::{
    ColumnDriver, ColumnPointer, Debouncer, KeyColumn, KeyEvent, KeyId, KeyRow, KeySink, Keymap,
    RowSampler,
};
pub use lines::{DigitalLines, LineRange, Pull};
pub use segments::Segments;
pub use timing::{Alarm, Micros};
