//! Transmit through the simulated board and receive the result on a second pin.

use irblip_driver::pulse::DEFAULT_MIN_PULSE_WIDTH;
use irblip_driver::sim::{demodulate, SimHal};
use irblip_driver::transmitter::REPEAT_GAP_US;
use irblip_driver::{Command, Pin, PulseInterval, ReceivedCode, Receiver, Transmitter};

pub const TX_PIN: Pin = 1;
pub const RX_PIN: Pin = 2;

/// Longest carrier pause that still belongs to one mark
const DEMOD_GAP_US: u64 = 100;
const SAFETY_MS: u64 = 5_000;
/// Quiet time on the receive pin before the replay starts
const REPLAY_DELAY_US: u64 = 1_000;

pub struct Loopback {
    sim: SimHal,
    tx_pin: Pin,
    rx_pin: Pin,
}

impl Loopback {
    pub fn new(tx_pin: Pin, rx_pin: Pin) -> Self {
        let sim = SimHal::new();
        sim.set_auto_advance(1);

        Loopback {
            sim,
            tx_pin,
            rx_pin,
        }
    }

    /// Send `cmd` followed by `repeats` copies and decode what arrives
    pub fn run(&self, cmd: Command, repeats: u8) -> anyhow::Result<Vec<ReceivedCode>> {
        let pulses = self.transmit(cmd, repeats)?;
        self.receive(&pulses, usize::from(repeats) + 1)
    }

    /// Intervals seen on the led, the way a demodulating receiver outputs them
    pub fn transmit(&self, cmd: Command, repeats: u8) -> anyhow::Result<Vec<PulseInterval>> {
        self.sim.clear_trace();

        let mut tx = Transmitter::new(self.sim.clone(), self.tx_pin);
        tx.set_repeat_count(repeats);
        tx.transmit(cmd)?;

        if !tx.wait_complete(SAFETY_MS) {
            anyhow::bail!("transmission of {:?} did not complete", cmd);
        }
        let end = self.sim.now();

        let trace = self.sim.trace(self.tx_pin);
        let mut pulses = demodulate(&trace, DEMOD_GAP_US);

        // The final space only ends when the transmission does
        if let Some(&(last_fall, _)) = trace.last() {
            let tail = end.saturating_sub(last_fall);
            if tail >= u64::from(DEFAULT_MIN_PULSE_WIDTH) {
                pulses.push(PulseInterval::try_from(tail).unwrap_or(PulseInterval::MAX));
            }
        }

        log::debug!("{} intervals on pin {}", pulses.len(), self.tx_pin);
        Ok(pulses)
    }

    /// Replay `pulses` as edges into a receiver and collect up to `frames` codes
    pub fn receive(
        &self,
        pulses: &[PulseInterval],
        frames: usize,
    ) -> anyhow::Result<Vec<ReceivedCode>> {
        let mut rx = Receiver::new(self.sim.clone(), self.rx_pin)?;

        let mut ts = self.sim.now() + REPLAY_DELAY_US;
        self.sim.schedule_edge(self.rx_pin, ts);

        for (i, dt) in pulses.iter().enumerate() {
            let dt = u64::from(*dt);
            // A repeat gap starts where the trailing space of the frame ends
            if i % 2 == 1 && dt > REPEAT_GAP_US {
                self.sim.schedule_edge(self.rx_pin, ts + dt - REPEAT_GAP_US);
            }
            ts += dt;
            self.sim.schedule_edge(self.rx_pin, ts);
        }

        let mut codes = Vec::new();
        while codes.len() < frames {
            match rx.receive_blocking()? {
                Some(code) => {
                    log::info!("{:?} {:#X} valid: {}", code.protocol, code.value, code.valid);
                    codes.push(code);
                }
                None => break,
            }
        }

        Ok(codes)
    }
}

impl Default for Loopback {
    fn default() -> Self {
        Loopback::new(TX_PIN, RX_PIN)
    }
}
