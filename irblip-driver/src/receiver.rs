//! Receive sessions on one input pin.

use crate::channel::{self, CHANNELS};
use crate::decoder;
use crate::error::Error;
use crate::hal::{EdgeMode, Hal, Pin, PinMode};
use crate::protocol::{Protocol, ReceivedCode};
use crate::pulse::{PulseInterval, PulseSequence, DEFAULT_MAX_PULSE_WIDTH, DEFAULT_MIN_PULSE_WIDTH};

pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const MIN_TIMEOUT_MS: u64 = 100;
pub const MAX_TIMEOUT_MS: u64 = 10_000;

/// Extra time `receive_blocking` waits past the receive timeout
const BLOCKING_MARGIN_MS: u64 = 100;

/// Called with code, protocol and validity when a session ends
pub type SignalCallback = fn(u32, Protocol, bool);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReceiverState {
    Idle,
    Receiving,
    SignalDetected,
    Timeout,
    Decoding,
}

pub struct Receiver<H: Hal> {
    hal: H,
    pin: Pin,
    state: ReceiverState,
    state_since_ms: u64,
    timeout_ms: u64,
    min_pulse_width: u16,
    max_pulse_width: u16,
    /// Frozen copy of the last capture
    pulses: PulseSequence,
    received: ReceivedCode,
    callback: Option<SignalCallback>,
    periodic: bool,
}

impl<H: Hal> Receiver<H> {
    /// Bind a receiver to `pin`. Only one receiver can own a pin at a time.
    pub fn new(mut hal: H, pin: Pin) -> Result<Self, Error> {
        CHANNELS.bind(pin)?;
        hal.set_pin_mode(pin, PinMode::Input);

        let now = hal.now_millis();

        Ok(Receiver {
            hal,
            pin,
            state: ReceiverState::Idle,
            state_since_ms: now,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            min_pulse_width: DEFAULT_MIN_PULSE_WIDTH,
            max_pulse_width: DEFAULT_MAX_PULSE_WIDTH,
            pulses: PulseSequence::new(),
            received: ReceivedCode::NONE,
            callback: None,
            periodic: false,
        })
    }

    pub fn start_receiving(&mut self) -> Result<(), Error> {
        if self.state == ReceiverState::Receiving {
            return Err(Error::Busy);
        }

        self.arm()?;
        self.hal
            .register_edge_notification(self.pin, EdgeMode::Change, channel::on_edge);
        Ok(())
    }

    /// Stop the session and detach from the edge source. Allowed in any state.
    pub fn stop_receiving(&mut self) {
        self.hal.unregister_edge_notification(self.pin);
        let _ = CHANNELS.with(self.pin, |capture| capture.disarm());

        if self.state == ReceiverState::Receiving {
            self.set_state(ReceiverState::Idle);
        }
    }

    pub fn start_periodic_receiving(&mut self, callback: SignalCallback) -> Result<(), Error> {
        self.set_signal_received_callback(callback);
        self.periodic = true;
        self.start_receiving()
    }

    pub fn stop_periodic_receiving(&mut self) {
        self.periodic = false;
        self.stop_receiving();
    }

    pub fn is_periodic_mode_active(&self) -> bool {
        self.periodic
    }

    pub fn set_signal_received_callback(&mut self, callback: SignalCallback) {
        self.callback = Some(callback);
    }

    pub fn clear_signal_received_callback(&mut self) {
        self.callback = None;
    }

    /// Accepts 100 to 10000 ms
    pub fn set_receive_timeout(&mut self, timeout_ms: u64) -> Result<(), Error> {
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms) {
            log::warn!("Invalid timeout {} ms (100-10000ms)", timeout_ms);
            return Err(Error::InvalidConfig { what: "receive timeout" });
        }
        self.timeout_ms = timeout_ms;
        Ok(())
    }

    /// Shorter intervals are dropped as noise
    pub fn set_min_pulse_width(&mut self, min_us: u16) -> Result<(), Error> {
        if min_us > self.max_pulse_width {
            log::warn!("Min pulse width {} above max {}", min_us, self.max_pulse_width);
            return Err(Error::InvalidConfig { what: "min pulse width" });
        }
        self.min_pulse_width = min_us;
        self.push_limits()
    }

    /// Longer intervals are dropped as noise. Silence over this ends a frame.
    pub fn set_max_pulse_width(&mut self, max_us: u16) -> Result<(), Error> {
        if max_us < self.min_pulse_width {
            log::warn!("Max pulse width {} below min {}", max_us, self.min_pulse_width);
            return Err(Error::InvalidConfig { what: "max pulse width" });
        }
        self.max_pulse_width = max_us;
        self.push_limits()
    }

    pub fn is_receiving(&self) -> bool {
        self.state == ReceiverState::Receiving
    }

    pub fn is_signal_detected(&self) -> bool {
        self.state == ReceiverState::SignalDetected
    }

    pub fn state(&self) -> ReceiverState {
        self.state
    }

    pub fn received(&self) -> ReceivedCode {
        self.received
    }

    pub fn received_code(&self) -> u32 {
        self.received.value
    }

    pub fn received_protocol(&self) -> Protocol {
        self.received.protocol
    }

    /// Intervals of the last decoded capture
    pub fn raw_data(&self) -> &[PulseInterval] {
        &self.pulses
    }

    /// Advance the session. Call this from the main loop.
    pub fn update(&mut self) {
        match self.state {
            ReceiverState::Receiving => {
                let now_us = self.hal.now_micros();
                let gap = u64::from(self.max_pulse_width);
                let ready = CHANNELS
                    .with(self.pin, |capture| capture.check_idle(now_us, gap))
                    .unwrap_or(false);

                if ready {
                    self.set_state(ReceiverState::Decoding);
                    self.process_capture();
                } else if self.elapsed_ms() > self.timeout_ms {
                    // No signal is not an error
                    self.received = ReceivedCode::NONE;
                    self.set_state(ReceiverState::Timeout);
                    self.notify();
                }
            }
            ReceiverState::SignalDetected | ReceiverState::Timeout => {
                if self.periodic {
                    if self.arm().is_err() {
                        self.set_state(ReceiverState::Idle);
                    }
                } else {
                    self.set_state(ReceiverState::Idle);
                }
            }
            ReceiverState::Idle => {
                if self.periodic {
                    let _ = self.start_receiving();
                }
            }
            ReceiverState::Decoding => {}
        }
    }

    /// Start a session and spin on `update` until it ends.
    ///
    /// Returns the decoded code, or `None` on timeout or when the session was
    /// stopped.
    pub fn receive_blocking(&mut self) -> Result<Option<ReceivedCode>, Error> {
        self.start_receiving()?;
        let started = self.hal.now_millis();
        let limit = self.timeout_ms + BLOCKING_MARGIN_MS;

        loop {
            self.update();

            match self.state {
                ReceiverState::SignalDetected => return Ok(Some(self.received)),
                ReceiverState::Timeout | ReceiverState::Idle => return Ok(None),
                _ => {}
            }

            if self.hal.now_millis().wrapping_sub(started) > limit {
                self.stop_receiving();
                return Ok(None);
            }
        }
    }

    fn arm(&mut self) -> Result<(), Error> {
        let (min, max) = (self.min_pulse_width, self.max_pulse_width);
        CHANNELS.with(self.pin, |capture| {
            capture.set_limits(min, max);
            capture.arm();
        })?;
        self.set_state(ReceiverState::Receiving);
        Ok(())
    }

    fn push_limits(&mut self) -> Result<(), Error> {
        let (min, max) = (self.min_pulse_width, self.max_pulse_width);
        CHANNELS.with(self.pin, |capture| capture.set_limits(min, max))
    }

    fn process_capture(&mut self) {
        let pulses = &mut self.pulses;
        let frozen = CHANNELS.with(self.pin, |capture| capture.take(pulses));
        if frozen.is_err() {
            self.pulses.clear();
        }

        self.received = decoder::decode(&self.pulses);
        log::debug!(
            "Decoded {} intervals as {:?} {:#X}",
            self.pulses.len(),
            self.received.protocol,
            self.received.value
        );

        self.set_state(ReceiverState::SignalDetected);
        self.notify();
    }

    fn notify(&self) {
        if let Some(callback) = self.callback {
            let valid = self.state == ReceiverState::SignalDetected && self.received.valid;
            callback(self.received.value, self.received.protocol, valid);
        }
    }

    fn elapsed_ms(&self) -> u64 {
        self.hal.now_millis().wrapping_sub(self.state_since_ms)
    }

    fn set_state(&mut self, state: ReceiverState) {
        log::debug!("Receiver {}: {:?} -> {:?}", self.pin, self.state, state);
        self.state = state;
        self.state_since_ms = self.hal.now_millis();
    }
}

impl<H: Hal> Drop for Receiver<H> {
    fn drop(&mut self) {
        self.periodic = false;
        self.stop_receiving();
        self.callback = None;
        CHANNELS.release(self.pin);
    }
}
