//! Software-managed periodic timers.
//!
//! The hardware offers a free-running microsecond counter and one-shot compare registers
//! ("alarms").  A periodic interrupt is built by having each handler re-arm its own alarm at
//! `now + period` before returning.  Since the target is computed from the counter's current
//! value and not from the previous target, a late interrupt delays subsequent firings but never
//! makes them pile up.

/// A duration in ticks of the free-running microsecond counter
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Micros(pub u32);

impl Micros {
    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    pub const fn from_millis(millis: u32) -> Self {
        Self(millis * 1_000)
    }

    pub const fn ticks(self) -> u32 {
        self.0
    }
}

/// One hardware alarm: a compare register matched against the low 32 bits of the free-running
/// microsecond counter, plus its interrupt-pending flag.
pub trait Alarm {
    /// Low 32 bits of the free-running microsecond counter
    fn now(&self) -> u32;

    /// Clear this alarm's interrupt-pending flag.  Must be the first thing a handler does.
    fn acknowledge(&mut self);

    /// Arm the alarm to fire when the counter reaches `target`.  Wraps like the counter does.
    fn arm_at(&mut self, target: u32);

    /// Route this alarm's match to its interrupt line
    fn enable_interrupt(&mut self);

    /// Arm the alarm for one `period` from now.
    ///
    /// This is the only re-arm rule used by the handlers in this crate.
    fn schedule_next(&mut self, period: Micros) {
        let target = self.now().wrapping_add(period.ticks());
        self.arm_at(target);
    }
}

/// Enable an alarm's interrupt and arm its first firing `first` from now.
///
/// The interrupt vector itself must already be bound to a handler which calls
/// [`Alarm::schedule_next`] on every firing; after this call the timer runs forever.
pub fn start_periodic<A: Alarm>(alarm: &mut A, first: Micros) {
    alarm.enable_interrupt();
    alarm.schedule_next(first);

    #[cfg(feature = "defmt")]
    defmt::debug!("alarm armed, first firing in {=u32} us", first.ticks());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockAlarm;

    #[test]
    fn schedule_next_is_relative_to_now() {
        let mut alarm = MockAlarm::at(1_000);
        alarm.schedule_next(Micros::from_millis(3));
        assert_eq!(alarm.armed, Some(4_000));

        // A late handler computes from the current counter value, not from the last target
        alarm.now = 9_500;
        alarm.schedule_next(Micros::from_millis(3));
        assert_eq!(alarm.armed, Some(12_500));
    }

    #[test]
    fn schedule_next_wraps() {
        let mut alarm = MockAlarm::at(u32::MAX - 10);
        alarm.schedule_next(Micros::from_micros(25));
        assert_eq!(alarm.armed, Some(14));
    }

    #[test]
    fn start_enables_then_arms() {
        let mut alarm = MockAlarm::at(0);
        start_periodic(&mut alarm, Micros::from_millis(1_100));
        assert!(alarm.enabled);
        assert_eq!(alarm.armed, Some(1_100_000));
        assert_eq!(alarm.acks, 0);
    }
}
