use crate::hal::Pin;

/// Reasons a driver operation was rejected.
///
/// A rejected operation has no side effects: the session and the previous
/// configuration stay as they were.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A session is already active
    #[error("session already active")]
    Busy,
    /// Parameter out of range
    #[error("invalid {what}")]
    InvalidConfig { what: &'static str },
    /// Raw transmission of an empty sequence
    #[error("empty pulse sequence")]
    EmptySequence,
    /// Another receiver owns the pin
    #[error("pin {0} already bound to a receiver")]
    PinInUse(Pin),
    /// All capture channels are taken
    #[error("no free capture channel")]
    NoFreeChannel,
    /// The pin has no capture channel
    #[error("pin {0} has no capture channel")]
    NotBound(Pin),
}
