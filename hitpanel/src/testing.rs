//! Host-side stand-ins for the register access traits

use crate::hit::{EdgeEvents, TriggerLine};
use crate::{Alarm, DigitalLines, Pull};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LineOp {
    Set(u32),
    Clear(u32),
    Toggle(u32),
    Output(u8),
    Input(u8, Pull),
}

#[derive(Default)]
pub struct MockLines {
    pub out: u32,
    pub input: u32,
    pub ops: Vec<LineOp>,
}

impl MockLines {
    pub fn with_inputs(input: u32) -> Self {
        Self {
            input,
            ..Default::default()
        }
    }
}

impl DigitalLines for MockLines {
    fn set(&mut self, mask: u32) {
        self.out |= mask;
        self.ops.push(LineOp::Set(mask));
    }

    fn clear(&mut self, mask: u32) {
        self.out &= !mask;
        self.ops.push(LineOp::Clear(mask));
    }

    fn toggle(&mut self, mask: u32) {
        self.out ^= mask;
        self.ops.push(LineOp::Toggle(mask));
    }

    fn outputs(&self) -> u32 {
        self.out
    }

    fn inputs(&self) -> u32 {
        self.input
    }

    fn configure_output(&mut self, pin: u8) {
        self.out &= !(1 << pin);
        self.ops.push(LineOp::Output(pin));
    }

    fn configure_input(&mut self, pin: u8, pull: Pull) {
        self.ops.push(LineOp::Input(pin, pull));
    }
}

pub struct MockAlarm {
    pub now: u32,
    pub armed: Option<u32>,
    pub arm_count: usize,
    pub acks: usize,
    pub enabled: bool,
}

impl MockAlarm {
    pub fn at(now: u32) -> Self {
        Self {
            now,
            armed: None,
            arm_count: 0,
            acks: 0,
            enabled: false,
        }
    }
}

impl Alarm for MockAlarm {
    fn now(&self) -> u32 {
        self.now
    }

    fn acknowledge(&mut self) {
        self.acks += 1;
    }

    fn arm_at(&mut self, target: u32) {
        self.armed = Some(target);
        self.arm_count += 1;
    }

    fn enable_interrupt(&mut self) {
        self.enabled = true;
    }
}

#[derive(Default)]
pub struct MockTrigger {
    pub latched: EdgeEvents,
    pub acknowledged: Vec<EdgeEvents>,
    pub rising_enabled: bool,
}

impl MockTrigger {
    pub fn latched(events: EdgeEvents) -> Self {
        Self {
            latched: events,
            ..Default::default()
        }
    }
}

impl TriggerLine for MockTrigger {
    fn pending(&self) -> EdgeEvents {
        self.latched
    }

    fn acknowledge(&mut self, events: EdgeEvents) {
        self.latched = self.latched.without(events);
        self.acknowledged.push(events);
    }

    fn enable_rising_edge(&mut self) {
        self.rising_enabled = true;
    }
}
