//! Register-level implementations of the line, alarm and trigger traits for the RP2040, built
//! directly on the PAC that `embassy-rp` re-exports.
//!
//! These are zero-sized (or nearly) handles with no ownership tracking: every operation is a
//! single write to one of the chip's atomic set/clear/xor register aliases, so each interrupt
//! handler can hold its own copy.  It's up to the firmware to make sure the HAL never touches the
//! same pins or alarms.

use embassy_rp::pac;

use crate::hit::{EdgeEvents, TriggerLine};
use crate::{Alarm, DigitalLines, Pull};

/// The SIO block's view of user bank 0
#[derive(Copy, Clone, Default)]
pub struct Sio;

impl Sio {
    fn select_sio_function(pin: u8) {
        pac::IO_BANK0.gpio(pin as usize).ctrl().write(|w| {
            w.set_funcsel(pac::io::vals::Gpio0ctrlFuncsel::SIO_0 as _);
        });
    }
}

impl DigitalLines for Sio {
    fn set(&mut self, mask: u32) {
        pac::SIO.gpio_out(0).value_set().write_value(mask);
    }

    fn clear(&mut self, mask: u32) {
        pac::SIO.gpio_out(0).value_clr().write_value(mask);
    }

    fn toggle(&mut self, mask: u32) {
        pac::SIO.gpio_out(0).value_xor().write_value(mask);
    }

    fn outputs(&self) -> u32 {
        pac::SIO.gpio_out(0).value().read()
    }

    fn inputs(&self) -> u32 {
        pac::SIO.gpio_in(0).read()
    }

    fn configure_output(&mut self, pin: u8) {
        let bit = 1 << pin;

        // Drive low before the pad is connected so the line comes up low
        pac::SIO.gpio_oe(0).value_set().write_value(bit);
        pac::SIO.gpio_out(0).value_clr().write_value(bit);

        pac::PADS_BANK0.gpio(pin as usize).modify(|w| {
            w.set_ie(false);
            w.set_od(false);
        });

        Self::select_sio_function(pin);

        // The RP2040 has no pad isolation latch, so the pad is live as soon as SIO owns it
    }

    fn configure_input(&mut self, pin: u8, pull: Pull) {
        pac::SIO.gpio_oe(0).value_clr().write_value(1 << pin);

        pac::PADS_BANK0.gpio(pin as usize).modify(|w| {
            let (pue, pde) = match pull {
                Pull::None => (false, false),
                Pull::Up => (true, false),
                Pull::Down => (false, true),
            };

            w.set_ie(true);
            w.set_od(false);
            w.set_pue(pue);
            w.set_pde(pde);
        });

        Self::select_sio_function(pin);
    }
}

/// One of the four TIMER alarms
#[derive(Copy, Clone, Default)]
pub struct TimerAlarm<const N: usize>;

impl<const N: usize> Alarm for TimerAlarm<N> {
    fn now(&self) -> u32 {
        // Raw read of the low word; doesn't latch the high word, so it's safe from any context
        pac::TIMER.timerawl().read()
    }

    fn acknowledge(&mut self) {
        pac::TIMER.intr().write(|w| w.set_alarm(N, true));
    }

    fn arm_at(&mut self, target: u32) {
        pac::TIMER.alarm(N).write_value(target);
    }

    fn enable_interrupt(&mut self) {
        pac::TIMER.inte().write_set(|w| w.set_alarm(N, true));
    }
}

/// The edge-detect latch of one bank 0 GPIO, as seen by processor 0
#[derive(Copy, Clone)]
pub struct Bank0Trigger {
    pin: u8,
}

impl Bank0Trigger {
    pub const fn new(pin: u8) -> Self {
        Self { pin }
    }

    /// Index of the INTR/INTE register holding this pin, and the bit offset of its 4-bit group
    const fn position(&self) -> (usize, u32) {
        ((self.pin / 8) as usize, (self.pin % 8) as u32 * 4)
    }
}

impl TriggerLine for Bank0Trigger {
    fn pending(&self) -> EdgeEvents {
        let (register, shift) = self.position();
        let raw = pac::IO_BANK0.intr(register).read().0;

        EdgeEvents::from_bits((raw >> shift) as u8)
    }

    fn acknowledge(&mut self, events: EdgeEvents) {
        // Only the edge bits are write-1-to-clear; level bits ignore the write
        let (register, shift) = self.position();
        pac::IO_BANK0
            .intr(register)
            .write_value(pac::io::regs::Int((events.bits() as u32) << shift));
    }

    fn enable_rising_edge(&mut self) {
        let (register, _) = self.position();
        let group = (self.pin % 8) as usize;

        pac::IO_BANK0
            .int_proc(0)
            .inte(register)
            .write_set(|w| w.set_edge_high(group, true));
    }
}
