//! Target panel firmware for a Pi Pico: 4x4 keypad, 8-digit multiplexed display and a
//! trigger-gated hit sensor.
//!
//! Keys typed on the keypad scroll across the display; `*` types a decimal point and `#` clears
//! the entry.  Every hit is logged and its running count shown until the next key press.

#![no_std]
#![no_main]

use core::fmt::Write;

use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::{AnyPin, Input, Pin, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::{String, Vec};
use {defmt_rtt as _, panic_probe as _};

use hitpanel::display::{self, DIGITS};
use hitpanel::keypad;
use hitpanel::rp2040::{Bank0Trigger, Sio, TimerAlarm};
use hitpanel::{
    ColumnDriver, ColumnPointer, Display, DisplayBuffer, Hit, HitDetector, KeyEvent, Keymap,
    PanelConfig, Refresh, RowSampler, TriggerReason,
};

const CONFIG: PanelConfig = PanelConfig::REFERENCE;

const KEY_QUEUE: usize = 32;
const HIT_QUEUE: usize = 4;

type RefreshAlarm = TimerAlarm<0>;
type ColumnAlarm = TimerAlarm<1>;
type SampleAlarm = TimerAlarm<2>;

type KeyChannel = Channel<CriticalSectionRawMutex, KeyEvent, KEY_QUEUE>;
type HitChannel = Channel<CriticalSectionRawMutex, Hit, HIT_QUEUE>;

static DISPLAY: DisplayBuffer = DisplayBuffer::new();
static COLUMN: ColumnPointer = ColumnPointer::new();
static KEYS: KeyChannel = Channel::new();
static HITS: HitChannel = Channel::new();

#[interrupt]
fn TIMER_IRQ_0() {
    static mut REFRESH: Refresh<'static, Sio, RefreshAlarm> = Refresh::new(
        &DISPLAY,
        CONFIG.display,
        CONFIG.display_timing.period,
        Sio,
        TimerAlarm,
    );

    REFRESH.on_interrupt();
}

#[interrupt]
fn TIMER_IRQ_1() {
    static mut COLUMNS: ColumnDriver<'static, Sio, ColumnAlarm> = ColumnDriver::new(
        &COLUMN,
        CONFIG.keypad.columns,
        CONFIG.keypad_timing.column_period,
        Sio,
        TimerAlarm,
    );

    COLUMNS.on_interrupt();
}

#[interrupt]
fn TIMER_IRQ_2() {
    static mut SAMPLER: RowSampler<'static, Sio, SampleAlarm, &'static KeyChannel> =
        RowSampler::new(
            &COLUMN,
            Keymap::REFERENCE,
            CONFIG.keypad.rows,
            CONFIG.keypad_timing.sample_period,
            Sio,
            TimerAlarm,
            &KEYS,
        );

    SAMPLER.on_interrupt();
}

/// Score trigger pulls.
///
/// The bank 0 vector belongs to the HAL, so the edge wakes this task and the detector then looks at
/// the trigger's latched events itself.  Starting a wait clears the pin's edge latches, so that
/// clear doubles as the acknowledge: the next wait is started once the edge has been classified
/// and before the hit line is sampled, and any pull from then on completes it.
#[embassy_executor::task]
async fn hit_task(
    mut trigger: Input<'static, AnyPin>,
    mut detector: HitDetector<Bank0Trigger, Input<'static, AnyPin>>,
) {
    trigger.wait_for_rising_edge().await;

    loop {
        let reason = detector.pending_reason();

        // `join` polls the wait first, which arms it before scoring runs
        join(trigger.wait_for_rising_edge(), async {
            if reason != TriggerReason::RisingEdge {
                return;
            }

            if let Some(hit) = detector.score(&mut &HITS) {
                info!("Hit! ({=u32} so far)", hit.count);
            }
        })
        .await;
    }
}

/// Append a typed character, scrolling the oldest digit off the left once the display is full.
///
/// A point only goes in after a digit that doesn't already have one.
fn push_entry<const N: usize>(entry: &mut Vec<u8, N>, c: u8) {
    if c == display::DECIMAL_POINT {
        if matches!(entry.last(), None | Some(&display::DECIMAL_POINT)) {
            return;
        }
    } else if entry.iter().filter(|c| **c != display::DECIMAL_POINT).count() >= DIGITS {
        entry.remove(0);
        if entry.first() == Some(&display::DECIMAL_POINT) {
            entry.remove(0);
        }
    }

    if entry.push(c).is_err() {
        warn!("entry full, ignoring {=char}", c as char);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    unwrap!(CONFIG.validate());
    debug!("Panel config: {}", CONFIG);

    let mut sio = Sio;
    display::initialize_pins(&mut sio, &CONFIG.display);
    keypad::initialize_pins(&mut sio, &CONFIG.keypad);

    let panel = Display::new(&DISPLAY);
    panel.print_str("HELLO");

    for irq in [
        interrupt::TIMER_IRQ_0,
        interrupt::TIMER_IRQ_1,
        interrupt::TIMER_IRQ_2,
    ] {
        irq.set_priority(Priority::P1);
        irq.unpend();
        // SAFETY: each handler owns its state and touches only its own lines and alarm
        unsafe { irq.enable() };
    }

    display::start_refresh(&mut RefreshAlarm::default(), &CONFIG.display_timing);
    keypad::start_scan(
        &mut ColumnAlarm::default(),
        &mut SampleAlarm::default(),
        &CONFIG.keypad_timing,
    );

    // The HAL configures these two pads; the pin numbers must agree with the config
    assert_eq!(p.PIN_21.pin(), CONFIG.hit.hit);
    assert_eq!(p.PIN_22.pin(), CONFIG.hit.trigger);
    let trigger = Input::new(p.PIN_22.degrade(), Pull::Down);
    let hit = Input::new(p.PIN_21.degrade(), Pull::Down);
    let detector = HitDetector::new(Bank0Trigger::new(CONFIG.hit.trigger), hit);
    unwrap!(spawner.spawn(hit_task(trigger, detector)));

    info!("Panel running");

    let mut entry: Vec<u8, { 2 * DIGITS }> = Vec::new();

    loop {
        match select(KEYS.receive(), HITS.receive()).await {
            Either::First(event) => {
                info!("{}", event);

                if !event.pressed {
                    continue;
                }

                match event.key {
                    b'#' => {
                        entry.clear();
                        panel.clear();
                        continue;
                    }
                    b'*' => push_entry(&mut entry, display::DECIMAL_POINT),
                    key => push_entry(&mut entry, key),
                }

                panel.print_with_decimal(&entry);
            }
            Either::Second(hit) => {
                let mut message: String<16> = String::new();
                if core::write!(message, "HIt {}", hit.count).is_err() {
                    warn!("hit count too long to show");
                }

                panel.print_str(&message);
            }
        }
    }
}
