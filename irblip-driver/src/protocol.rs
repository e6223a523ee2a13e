//! Protocol identities and frame timings shared by the decoder and encoder.

/// Protocol Id
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    Unknown,
    Nec,
    Rc5,
    Sony,
    Raw,
}

impl Protocol {
    pub fn name(&self) -> &'static str {
        match self {
            Protocol::Unknown => "unknown",
            Protocol::Nec => "nec",
            Protocol::Rc5 => "rc5",
            Protocol::Sony => "sony",
            Protocol::Raw => "raw",
        }
    }
}

impl TryFrom<&str> for Protocol {
    type Error = ();

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "nec" => Ok(Protocol::Nec),
            "rc5" => Ok(Protocol::Rc5),
            "sony" | "sirc" => Ok(Protocol::Sony),
            _ => Err(()),
        }
    }
}

/// Result of a receive session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ReceivedCode {
    pub protocol: Protocol,
    pub value: u32,
    pub valid: bool,
}

impl ReceivedCode {
    pub const NONE: ReceivedCode = ReceivedCode {
        protocol: Protocol::Unknown,
        value: 0,
        valid: false,
    };

    pub fn decoded(protocol: Protocol, value: u32) -> Self {
        ReceivedCode {
            protocol,
            value,
            valid: true,
        }
    }
}

impl Default for ReceivedCode {
    fn default() -> Self {
        ReceivedCode::NONE
    }
}

/// A command to be encoded and sent
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Nec(u32),
    Rc5(u16),
    Sony(u16),
}

impl Command {
    pub fn new(protocol: Protocol, code: u32) -> Option<Command> {
        match protocol {
            Protocol::Nec => Some(Command::Nec(code)),
            Protocol::Rc5 => u16::try_from(code).ok().map(Command::Rc5),
            Protocol::Sony => u16::try_from(code).ok().map(Command::Sony),
            Protocol::Raw | Protocol::Unknown => None,
        }
    }

    pub fn protocol(&self) -> Protocol {
        match self {
            Command::Nec(_) => Protocol::Nec,
            Command::Rc5(_) => Protocol::Rc5,
            Command::Sony(_) => Protocol::Sony,
        }
    }
}

/// Nominal duration and accepted deviation, in microseconds
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Timing {
    pub nominal: u16,
    pub tolerance: u16,
}

impl Timing {
    pub const fn new(nominal: u16, tolerance: u16) -> Self {
        Timing { nominal, tolerance }
    }

    pub fn matches(&self, interval: u16) -> bool {
        interval >= self.nominal.saturating_sub(self.tolerance)
            && interval <= self.nominal.saturating_add(self.tolerance)
    }
}

pub mod nec {
    use super::Timing;

    pub const HEADER_MARK: Timing = Timing::new(9000, 1000);
    pub const HEADER_SPACE: Timing = Timing::new(4500, 500);
    pub const BIT_MARK: Timing = Timing::new(562, 200);
    pub const ZERO_SPACE: Timing = Timing::new(562, 200);
    pub const ONE_SPACE: Timing = Timing::new(1687, 300);
    /// Space after the stop mark, closing the frame
    pub const TRAILING_SPACE: u16 = 562;

    pub const BITS: usize = 32;
    pub const MIN_INTERVALS: usize = 34;
    pub const FRAME_LEN: usize = 68;
}

pub mod sony {
    use super::Timing;

    pub const HEADER_MARK: Timing = Timing::new(2400, 300);
    pub const HEADER_SPACE: Timing = Timing::new(600, 200);
    pub const ZERO_MARK: Timing = Timing::new(600, 200);
    pub const ONE_MARK: Timing = Timing::new(1200, 300);
    pub const BIT_SPACE: Timing = Timing::new(600, 200);

    pub const BITS: usize = 12;
    pub const MIN_INTERVALS: usize = 24;
    pub const FRAME_LEN: usize = 26;
}

pub mod rc5 {
    use super::Timing;

    pub const HALF_BIT: Timing = Timing::new(889, 889 / 4);

    pub const BITS: usize = 14;
    pub const MIN_INTERVALS: usize = 28;
    pub const FRAME_LEN: usize = 28;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_window_is_inclusive() {
        let t = Timing::new(562, 200);
        assert!(t.matches(362));
        assert!(t.matches(762));
        assert!(!t.matches(361));
        assert!(!t.matches(763));
    }

    #[test]
    fn command_from_protocol() {
        assert_eq!(Command::new(Protocol::Nec, 0xFFFF_FFFF), Some(Command::Nec(0xFFFF_FFFF)));
        assert_eq!(Command::new(Protocol::Sony, 0x95), Some(Command::Sony(0x95)));
        assert_eq!(Command::new(Protocol::Rc5, 0x1_0000), None);
        assert_eq!(Command::new(Protocol::Raw, 1), None);
        assert_eq!(Command::Rc5(7).protocol(), Protocol::Rc5);
    }

    #[test]
    fn protocol_names() {
        assert_eq!(Protocol::try_from("sony"), Ok(Protocol::Sony));
        assert_eq!(Protocol::try_from("rc6"), Err(()));
        assert_eq!(Protocol::Rc5.name(), "rc5");
    }
}
