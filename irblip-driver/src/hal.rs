//! Peripheral interface consumed by the driver.

/// Pin identity
pub type Pin = u8;

/// Called by the peripheral on every edge of a registered pin, with the pin
/// and the microsecond timestamp of the edge. Carries no instance context.
pub type EdgeHandler = fn(Pin, u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullup,
    Output,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EdgeMode {
    Rising,
    Falling,
    Change,
}

/// Digital pins, clock and edge notifications of the board.
///
/// Both clocks are monotonic and may wrap.
pub trait Hal {
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode);
    fn write_pin(&mut self, pin: Pin, level: Level);
    fn read_pin(&self, pin: Pin) -> Level;
    fn now_micros(&self) -> u64;
    fn now_millis(&self) -> u64;
    fn register_edge_notification(&mut self, pin: Pin, mode: EdgeMode, handler: EdgeHandler);
    fn unregister_edge_notification(&mut self, pin: Pin);
}
