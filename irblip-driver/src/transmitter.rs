//! Carrier modulated output of pulse sequences on one led pin.

use crate::encoder;
use crate::error::Error;
use crate::hal::{Hal, Level, Pin, PinMode};
use crate::protocol::Command;
use crate::pulse::{self, PulseInterval, PulseSequence, SEQUENCE_CAPACITY};

pub const DEFAULT_CARRIER_FREQUENCY: u32 = 38_000;
pub const MIN_CARRIER_FREQUENCY: u32 = 30_000;
pub const MAX_CARRIER_FREQUENCY: u32 = 60_000;

/// Silence between repeated frames
pub const REPEAT_GAP_US: u64 = 45_000;

/// Called with the outcome when a transmission ends
pub type CompleteCallback = fn(bool);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TransmitterState {
    Idle,
    Transmitting,
    Complete,
    Error,
}

enum Frame<'a> {
    /// Built by the encoder, owned by the transmitter
    Encoded(PulseSequence),
    /// Caller's buffer, must outlive the transmission
    Borrowed(&'a [PulseInterval]),
}

impl<'a> Frame<'a> {
    fn as_slice(&self) -> &[PulseInterval] {
        match self {
            Frame::Encoded(seq) => seq,
            Frame::Borrowed(slice) => slice,
        }
    }
}

pub struct Transmitter<'a, H: Hal> {
    hal: H,
    pin: Pin,
    state: TransmitterState,
    frame: Option<Frame<'a>>,
    index: usize,
    /// Start of the current interval
    interval_start: u64,
    /// Start of the gap before the next repeat
    gap_start: Option<u64>,
    carrier_high: bool,
    last_toggle: u64,
    carrier_frequency: u32,
    power: u8,
    repeat_count: u8,
    current_repeat: u8,
    callback: Option<CompleteCallback>,
}

impl<'a, H: Hal> Transmitter<'a, H> {
    pub fn new(mut hal: H, pin: Pin) -> Self {
        hal.set_pin_mode(pin, PinMode::Output);
        hal.write_pin(pin, Level::Low);

        Transmitter {
            hal,
            pin,
            state: TransmitterState::Idle,
            frame: None,
            index: 0,
            interval_start: 0,
            gap_start: None,
            carrier_high: false,
            last_toggle: 0,
            carrier_frequency: DEFAULT_CARRIER_FREQUENCY,
            power: u8::MAX,
            repeat_count: 0,
            current_repeat: 0,
            callback: None,
        }
    }

    pub fn transmit(&mut self, cmd: Command) -> Result<(), Error> {
        self.check_idle()?;
        log::debug!("Sending command: {:?} at power {}", cmd, self.power);
        self.start(Frame::Encoded(encoder::encode(cmd)));
        Ok(())
    }

    pub fn transmit_nec(&mut self, code: u32) -> Result<(), Error> {
        self.transmit(Command::Nec(code))
    }

    pub fn transmit_rc5(&mut self, code: u16) -> Result<(), Error> {
        self.transmit(Command::Rc5(code))
    }

    pub fn transmit_sony(&mut self, code: u16) -> Result<(), Error> {
        self.transmit(Command::Sony(code))
    }

    /// Send `timings` as is, starting with a mark. The buffer is not copied.
    pub fn transmit_raw(&mut self, timings: &'a [PulseInterval]) -> Result<(), Error> {
        self.check_idle()?;

        if timings.is_empty() {
            return Err(Error::EmptySequence);
        }
        if timings.len() > SEQUENCE_CAPACITY {
            return Err(Error::InvalidConfig { what: "sequence length" });
        }

        log::debug!("Sending {} raw intervals", timings.len());
        self.start(Frame::Borrowed(timings));
        Ok(())
    }

    /// End a running transmission as failed. Allowed in any state.
    pub fn abort(&mut self) {
        if self.state == TransmitterState::Transmitting {
            self.finish(false);
        } else {
            self.hal.write_pin(self.pin, Level::Low);
        }
    }

    pub fn is_transmitting(&self) -> bool {
        self.state == TransmitterState::Transmitting
    }

    pub fn is_complete(&self) -> bool {
        self.state == TransmitterState::Complete
    }

    pub fn state(&self) -> TransmitterState {
        self.state
    }

    pub fn set_transmission_complete_callback(&mut self, callback: CompleteCallback) {
        self.callback = Some(callback);
    }

    pub fn clear_transmission_complete_callback(&mut self) {
        self.callback = None;
    }

    /// Accepts 30 to 60 kHz
    pub fn set_carrier_frequency(&mut self, frequency: u32) -> Result<(), Error> {
        if !(MIN_CARRIER_FREQUENCY..=MAX_CARRIER_FREQUENCY).contains(&frequency) {
            log::warn!("Invalid carrier frequency {} (30-60kHz)", frequency);
            return Err(Error::InvalidConfig { what: "carrier frequency" });
        }
        self.carrier_frequency = frequency;
        Ok(())
    }

    pub fn carrier_frequency(&self) -> u32 {
        self.carrier_frequency
    }

    /// Led intensity. The output is on/off until pwm drive is added.
    pub fn set_transmit_power(&mut self, power: u8) {
        self.power = power;
    }

    /// Number of extra frames sent after the first one
    pub fn set_repeat_count(&mut self, repeats: u8) {
        self.repeat_count = repeats;
    }

    /// Advance the transmission. Call at least once per carrier half period.
    pub fn update(&mut self) {
        match self.state {
            TransmitterState::Transmitting => self.step(),
            TransmitterState::Complete | TransmitterState::Error => {
                self.state = TransmitterState::Idle;
            }
            TransmitterState::Idle => {}
        }
    }

    /// Spin on `update` until the transmission ends. Aborts after `safety_ms`.
    ///
    /// Returns true if the transmission completed. Complete or Error is left
    /// in place for the caller.
    pub fn wait_complete(&mut self, safety_ms: u64) -> bool {
        let started = self.hal.now_millis();

        while self.state == TransmitterState::Transmitting {
            self.update();

            if self.hal.now_millis().wrapping_sub(started) > safety_ms {
                log::warn!("Transmission on pin {} timed out", self.pin);
                self.abort();
            }
        }

        self.state == TransmitterState::Complete
    }

    fn check_idle(&self) -> Result<(), Error> {
        if self.state == TransmitterState::Transmitting {
            Err(Error::Busy)
        } else {
            Ok(())
        }
    }

    fn start(&mut self, frame: Frame<'a>) {
        let now = self.hal.now_micros();

        self.frame = Some(frame);
        self.index = 0;
        self.current_repeat = 0;
        self.interval_start = now;
        self.gap_start = None;
        self.carrier_high = false;
        self.last_toggle = now;
        self.state = TransmitterState::Transmitting;
    }

    fn step(&mut self) {
        let now = self.hal.now_micros();

        let len = match self.frame.as_ref() {
            Some(frame) => frame.as_slice().len(),
            None => {
                log::warn!("Transmitting without a frame");
                self.finish(false);
                return;
            }
        };

        if let Some(gap_start) = self.gap_start {
            if now.wrapping_sub(gap_start) < REPEAT_GAP_US {
                return;
            }
            self.gap_start = None;
            self.index = 0;
            self.interval_start = now;
        }

        if self.index >= len {
            if self.current_repeat < self.repeat_count {
                self.current_repeat += 1;
                self.gap_start = Some(now);
                self.carrier_off();
            } else {
                self.finish(true);
            }
            return;
        }

        let duration = self
            .frame
            .as_ref()
            .map_or(0, |frame| frame.as_slice()[self.index]);

        if now.wrapping_sub(self.interval_start) >= u64::from(duration) {
            self.index += 1;
            self.interval_start = now;
            self.carrier_off();
        } else if pulse::is_mark(self.index) {
            self.carrier(now);
        } else {
            self.carrier_off();
        }
    }

    fn carrier(&mut self, now: u64) {
        let half_period = 1_000_000 / (2 * u64::from(self.carrier_frequency));

        if now.wrapping_sub(self.last_toggle) >= half_period {
            self.carrier_high = !self.carrier_high;
            self.hal.write_pin(self.pin, Level::from(self.carrier_high));
            self.last_toggle = now;
        }
    }

    fn carrier_off(&mut self) {
        self.carrier_high = false;
        self.hal.write_pin(self.pin, Level::Low);
    }

    fn finish(&mut self, success: bool) {
        self.carrier_off();
        self.frame = None;
        self.gap_start = None;
        self.state = if success {
            TransmitterState::Complete
        } else {
            TransmitterState::Error
        };
        log::debug!("Transmitter {}: {:?}", self.pin, self.state);

        if let Some(callback) = self.callback {
            callback(success);
        }
    }
}

impl<'a, H: Hal> Drop for Transmitter<'a, H> {
    fn drop(&mut self) {
        self.hal.write_pin(self.pin, Level::Low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;
    use crate::protocol::{Protocol, ReceivedCode};
    use crate::sim::{demodulate, SimHal};
    use std::cell::RefCell;
    use std::vec::Vec;

    const LED: Pin = 3;

    thread_local! {
        static DONE: RefCell<Vec<bool>> = RefCell::new(Vec::new());
    }

    fn record(success: bool) {
        DONE.with(|d| d.borrow_mut().push(success));
    }

    fn done() -> Vec<bool> {
        DONE.with(|d| d.borrow().clone())
    }

    fn sim() -> SimHal {
        let _ = env_logger::builder().is_test(true).try_init();
        let sim = SimHal::new();
        sim.set_auto_advance(1);
        sim
    }

    #[test]
    fn nec_frame_on_the_wire() {
        let sim = sim();
        let mut tx = Transmitter::new(sim.clone(), LED);
        assert_eq!(sim.mode(LED), Some(PinMode::Output));
        tx.set_transmission_complete_callback(record);

        tx.transmit_nec(0x00FF_00FF).unwrap();
        assert!(tx.is_transmitting());
        assert!(tx.wait_complete(1_000));
        assert!(tx.is_complete());
        assert_eq!(done(), vec![true]);
        assert_eq!(sim.level(LED), Level::Low);

        let pulses = demodulate(&sim.trace(LED), 100);
        assert_eq!(pulses.len(), 67);
        assert_eq!(decode(&pulses), ReceivedCode::decoded(Protocol::Nec, 0x00FF_00FF));

        // Complete lasts until the next update
        tx.update();
        assert_eq!(tx.state(), TransmitterState::Idle);
    }

    #[test]
    fn busy_keeps_frame_in_flight() {
        let sim = sim();
        let mut tx = Transmitter::new(sim.clone(), LED);

        tx.transmit_sony(0x95).unwrap();
        for _ in 0..100 {
            tx.update();
        }
        assert_eq!(tx.transmit_nec(0x1234_5678), Err(Error::Busy));
        assert_eq!(tx.transmit_raw(&[100, 100]), Err(Error::Busy));
        assert!(tx.wait_complete(1_000));

        let pulses = demodulate(&sim.trace(LED), 100);
        assert_eq!(decode(&pulses), ReceivedCode::decoded(Protocol::Sony, 0x95));
    }

    #[test]
    fn carrier_toggles_at_half_period() {
        let sim = sim();
        let frame = [1000u16];
        let mut tx = Transmitter::new(sim.clone(), LED);
        tx.transmit_raw(&frame).unwrap();
        assert!(tx.wait_complete(100));

        let trace = sim.trace(LED);
        // 1_000_000 / (2 * 38_000), the final write is cut short by the interval end
        for pair in trace[..trace.len() - 1].windows(2) {
            let dt = pair[1].0 - pair[0].0;
            assert!((13..=15).contains(&dt), "dt {}", dt);
        }
        assert!(trace.len() > 60);

        assert_eq!(tx.set_carrier_frequency(29_999), Err(Error::InvalidConfig { what: "carrier frequency" }));
        assert_eq!(tx.set_carrier_frequency(60_001), Err(Error::InvalidConfig { what: "carrier frequency" }));
        assert_eq!(tx.carrier_frequency(), 38_000);
        assert_eq!(tx.set_carrier_frequency(56_000), Ok(()));
    }

    #[test]
    fn elapsed_time_not_call_count() {
        let sim = SimHal::new();
        sim.set_auto_advance(3);
        let mut tx = Transmitter::new(sim.clone(), LED);

        tx.transmit_nec(0x20DF_10EF).unwrap();
        assert!(tx.wait_complete(1_000));

        let pulses = demodulate(&sim.trace(LED), 100);
        assert_eq!(decode(&pulses), ReceivedCode::decoded(Protocol::Nec, 0x20DF_10EF));
        assert!((8_900..=9_100).contains(&pulses[0]));
    }

    #[test]
    fn repeats_after_gap() {
        let sim = sim();
        let mut tx = Transmitter::new(sim.clone(), LED);
        tx.set_transmission_complete_callback(record);
        tx.set_repeat_count(2);

        tx.transmit_nec(0x0000_0001).unwrap();
        assert!(tx.wait_complete(1_000));
        assert_eq!(done(), vec![true]);

        let pulses = demodulate(&sim.trace(LED), 100);
        assert_eq!(pulses.len(), 3 * 67 + 2);
        // Trailing space and repeat gap
        let gap = u32::from(pulses[67]);
        assert!((45_500..=45_700).contains(&gap), "gap {}", gap);
        assert_eq!(decode(&pulses[68..]), ReceivedCode::decoded(Protocol::Nec, 1));
    }

    #[test]
    fn raw_sequence_checks() {
        let sim = sim();
        let long = [500u16; 129];
        let mut tx = Transmitter::new(sim, LED);
        assert_eq!(tx.transmit_raw(&[]), Err(Error::EmptySequence));

        assert_eq!(
            tx.transmit_raw(&long),
            Err(Error::InvalidConfig { what: "sequence length" })
        );
        assert_eq!(tx.state(), TransmitterState::Idle);
    }

    #[test]
    fn abort_ends_as_error() {
        let sim = sim();
        let mut tx = Transmitter::new(sim.clone(), LED);
        tx.set_transmission_complete_callback(record);

        tx.transmit_rc5(0x0ABC).unwrap();
        for _ in 0..50 {
            tx.update();
        }
        tx.abort();
        assert_eq!(tx.state(), TransmitterState::Error);
        assert_eq!(done(), vec![false]);
        assert_eq!(sim.level(LED), Level::Low);

        tx.update();
        assert_eq!(tx.state(), TransmitterState::Idle);

        // Abort from idle is a no-op
        tx.abort();
        assert_eq!(tx.state(), TransmitterState::Idle);
    }

    #[test]
    fn missing_frame_is_error() {
        let sim = sim();
        let mut tx = Transmitter::new(sim, LED);
        tx.set_transmission_complete_callback(record);
        tx.transmit_nec(1).unwrap();

        tx.frame = None;
        tx.update();
        assert_eq!(tx.state(), TransmitterState::Error);
        assert_eq!(done(), vec![false]);
    }

    #[test]
    fn safety_limit_aborts() {
        let sim = sim();
        let mut tx = Transmitter::new(sim, LED);
        tx.set_repeat_count(u8::MAX);
        tx.transmit_sony(1).unwrap();

        assert!(!tx.wait_complete(50));
        assert_eq!(tx.state(), TransmitterState::Error);
    }
}
