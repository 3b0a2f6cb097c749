//! Trigger-gated hit detection.
//!
//! The sensor has two lines: a trigger line that pulses when a shot is fired at the panel, and a
//! hit line that is asserted while the light sensor sees the beam.  A rising edge on the trigger
//! samples the hit line; if it's asserted at that moment, the shot counts as a hit.
//!
//! The trigger's edge interrupt shares a vector with every other GPIO in the bank, so the handler
//! looks at the trigger line's own latched events first and does nothing unless a rising edge is
//! among them.

use core::ops::BitOr;

use crate::config::HitPins;
use crate::{DigitalLines, Pull};

/// Latched interrupt events for one GPIO, in the RP2040's 4-bit per-pin layout
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeEvents(u8);

impl EdgeEvents {
    pub const NONE: Self = Self(0);
    pub const LEVEL_LOW: Self = Self(0b0001);
    pub const LEVEL_HIGH: Self = Self(0b0010);
    pub const EDGE_LOW: Self = Self(0b0100);
    pub const EDGE_HIGH: Self = Self(0b1000);

    /// Only the low nibble is meaningful; anything above it is discarded
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x0f)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for EdgeEvents {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Why the trigger line's interrupt vector ran
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TriggerReason {
    /// The trigger line saw a rising edge
    RisingEdge,
    /// Something else on the shared vector; not ours to handle
    Spurious,
}

/// Decide whether a set of latched events is a trigger pull
pub const fn classify(events: EdgeEvents) -> TriggerReason {
    if events.contains(EdgeEvents::EDGE_HIGH) {
        TriggerReason::RisingEdge
    } else {
        TriggerReason::Spurious
    }
}

/// The edge-interrupt side of the trigger line
pub trait TriggerLine {
    /// Events currently latched for this line
    fn pending(&self) -> EdgeEvents;

    /// Clear exactly `events` for this line, leaving other latched events (and other lines) alone
    fn acknowledge(&mut self, events: EdgeEvents);

    /// Route rising edges on this line to the bank's interrupt
    fn enable_rising_edge(&mut self);
}

/// The hit line, sampled when the trigger fires
pub trait HitLine {
    fn is_asserted(&mut self) -> bool;
}

/// Any embedded-hal input pin will do.  A pin that fails to read counts as not asserted.
impl<P: embedded_hal_1::digital::InputPin> HitLine for P {
    fn is_asserted(&mut self) -> bool {
        self.is_high().unwrap_or(false)
    }
}

/// A scored hit
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hit {
    /// 1 for the first hit since startup, counting up
    pub count: u32,
}

/// Destination for hits, called from interrupt context.  Must not block.
pub trait HitSink {
    fn report(&mut self, hit: Hit);
}

/// Sink that only logs; what the panel does when nothing downstream wants to keep score
pub struct LogHits;

impl HitSink for LogHits {
    fn report(&mut self, _hit: Hit) {
        #[cfg(feature = "defmt")]
        defmt::info!("Hit! ({=u32})", _hit.count);
    }
}

#[cfg(feature = "embassy-sync")]
impl<'c, M: embassy_sync::blocking_mutex::raw::RawMutex, const N: usize> HitSink
    for &'c embassy_sync::channel::Channel<M, Hit, N>
{
    fn report(&mut self, hit: Hit) {
        if self.try_send(hit).is_err() {
            #[cfg(feature = "defmt")]
            defmt::warn!("hit queue full, dropped {}", hit);
        }
    }
}

/// State of the trigger interrupt
pub struct HitDetector<T, H> {
    trigger: T,
    hit: H,
    hits: u32,
}

impl<T: TriggerLine, H: HitLine> HitDetector<T, H> {
    pub const fn new(trigger: T, hit: H) -> Self {
        Self {
            trigger,
            hit,
            hits: 0,
        }
    }

    /// Configure both lines as inputs and enable the trigger's rising-edge interrupt.
    pub fn initialize<L: DigitalLines>(&mut self, lines: &mut L, pins: &HitPins) {
        lines.configure_input(pins.hit, Pull::Down);
        lines.configure_input(pins.trigger, Pull::Down);
        self.trigger.enable_rising_edge();
    }

    /// Classify the trigger's latched events without acknowledging anything
    pub fn pending_reason(&self) -> TriggerReason {
        let events = self.trigger.pending();
        let reason = classify(events);

        #[cfg(feature = "defmt")]
        if reason == TriggerReason::Spurious && !events.is_empty() {
            defmt::trace!("ignoring trigger events {}", events);
        }

        reason
    }

    /// Sample the hit line for a trigger pull that has already been classified and acknowledged,
    /// and report a hit if it's asserted.
    pub fn score<S: HitSink>(&mut self, sink: &mut S) -> Option<Hit> {
        if !self.hit.is_asserted() {
            return None;
        }

        self.hits = self.hits.wrapping_add(1);
        let hit = Hit { count: self.hits };
        sink.report(hit);

        Some(hit)
    }

    /// Body of the trigger interrupt.
    ///
    /// The edge is acknowledged before the hit line is sampled, so a trigger pulse arriving while
    /// this runs latches a fresh edge and fires the vector again rather than being lost.
    pub fn on_interrupt<S: HitSink>(&mut self, sink: &mut S) -> Option<Hit> {
        match self.pending_reason() {
            TriggerReason::Spurious => None,
            TriggerReason::RisingEdge => {
                self.trigger.acknowledge(EdgeEvents::EDGE_HIGH);
                self.score(sink)
            }
        }
    }

    /// Number of hits since startup
    pub fn hits(&self) -> u32 {
        self.hits
    }
}
