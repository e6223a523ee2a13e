#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Infrared remote control driver.
//!
//! Captures mark/space timings from a demodulating receiver, classifies them as
//! NEC, Sony SIRC-12 or RC5 commands, and drives carrier modulated frames out
//! through an IR led. All progress is made from the `update` functions, which
//! the application calls from its main loop. Edge notifications are the only
//! asynchronous input and are routed through [`channel::on_edge`].

pub mod channel;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod hal;
pub mod protocol;
pub mod pulse;
pub mod receiver;
pub mod transmitter;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use error::Error;
pub use hal::{EdgeHandler, EdgeMode, Hal, Level, Pin, PinMode};
pub use protocol::{Command, Protocol, ReceivedCode};
pub use pulse::{PulseInterval, PulseSequence};
pub use receiver::{Receiver, ReceiverState};
pub use transmitter::{Transmitter, TransmitterState};
