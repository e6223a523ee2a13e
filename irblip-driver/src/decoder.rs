//! Classify a captured sequence as NEC, Sony or RC5.
//!
//! Protocols are tried in the fixed order NEC, Sony, RC5 and the first match
//! wins. A sequence matching none of them is reported as Raw with code 0.

use crate::protocol::{nec, rc5, sony, Protocol, ReceivedCode};
use crate::pulse::PulseInterval;

pub fn decode(pulses: &[PulseInterval]) -> ReceivedCode {
    let decoders: [(Protocol, fn(&[PulseInterval]) -> Option<u32>); 3] = [
        (Protocol::Nec, decode_nec),
        (Protocol::Sony, decode_sony),
        (Protocol::Rc5, decode_rc5),
    ];

    for (protocol, decoder) in decoders.iter() {
        if let Some(value) = decoder(pulses) {
            log::trace!("{:?} match: {:#X}", protocol, value);
            return ReceivedCode::decoded(*protocol, value);
        }
    }

    log::trace!("no protocol match for {} intervals", pulses.len());
    ReceivedCode::decoded(Protocol::Raw, 0)
}

/// 32 bits, MSB first. Bit value is in the space length.
pub fn decode_nec(pulses: &[PulseInterval]) -> Option<u32> {
    if pulses.len() < nec::MIN_INTERVALS {
        return None;
    }

    if !nec::HEADER_MARK.matches(pulses[0]) || !nec::HEADER_SPACE.matches(pulses[1]) {
        return None;
    }

    let mut code: u32 = 0;

    for i in 0..nec::BITS {
        let (mark, space) = bit_pair(pulses, 2 + i * 2)?;

        if !nec::BIT_MARK.matches(mark) {
            return None;
        }

        if nec::ONE_SPACE.matches(space) {
            code |= 1 << (31 - i);
        } else if !nec::ZERO_SPACE.matches(space) {
            return None;
        }
    }

    Some(code)
}

/// Up to 12 bits, LSB first. Bit value is in the mark length.
///
/// A capture with fewer than 12 bit pairs is accepted with the bits it has.
///
/// A receiver never sees an edge close the final space, so a capture ends on
/// the last mark and bit 11 has no pair. It reads as zero: 0x800 decodes as 0.
pub fn decode_sony(pulses: &[PulseInterval]) -> Option<u32> {
    if pulses.len() < sony::MIN_INTERVALS {
        return None;
    }

    if !sony::HEADER_MARK.matches(pulses[0]) || !sony::HEADER_SPACE.matches(pulses[1]) {
        return None;
    }

    let mut code: u16 = 0;

    for i in 0..sony::BITS {
        let (mark, space) = match bit_pair(pulses, 2 + i * 2) {
            Some(pair) => pair,
            None => break,
        };

        if sony::ONE_MARK.matches(mark) {
            code |= 1 << i;
        } else if !sony::ZERO_MARK.matches(mark) {
            return None;
        }

        if !sony::BIT_SPACE.matches(space) {
            return None;
        }
    }

    Some(u32::from(code))
}

/// 14 bit positions, MSB first.
///
/// Every position whose two half bits are both near 889 µs reads as a one.
/// Transition direction is not looked at, so zeros can not be told apart
/// from ones and every accepted frame decodes to 0x3FFF.
pub fn decode_rc5(pulses: &[PulseInterval]) -> Option<u32> {
    if pulses.len() < rc5::MIN_INTERVALS {
        return None;
    }

    let mut code: u16 = 0;

    for i in 0..rc5::BITS {
        let (first, second) = bit_pair(pulses, i * 2)?;

        if !rc5::HALF_BIT.matches(first) || !rc5::HALF_BIT.matches(second) {
            return None;
        }

        code |= 1 << (13 - i);
    }

    Some(u32::from(code))
}

fn bit_pair(pulses: &[PulseInterval], index: usize) -> Option<(PulseInterval, PulseInterval)> {
    match (pulses.get(index), pulses.get(index + 1)) {
        (Some(a), Some(b)) => Some((*a, *b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nec_frame(code: u32) -> heapless::Vec<u16, 128> {
        let mut v = heapless::Vec::new();
        v.extend_from_slice(&[9000, 4500]).unwrap();
        for i in (0..32).rev() {
            let space = if code & (1 << i) != 0 { 1687 } else { 562 };
            v.extend_from_slice(&[562, space]).unwrap();
        }
        v.push(562).unwrap();
        v
    }

    #[test]
    fn nec_with_receiver_jitter() {
        let mut frame = nec_frame(0x20DF_10EF);
        // Typical demodulator skew: long marks, short spaces
        for (i, t) in frame.iter_mut().enumerate() {
            if i % 2 == 0 {
                *t += 120;
            } else {
                *t -= 120;
            }
        }
        assert_eq!(decode(&frame), ReceivedCode::decoded(Protocol::Nec, 0x20DF_10EF));
    }

    #[test]
    fn nec_bad_space_rejects() {
        let mut frame = nec_frame(0x00FF_00FF);
        // Between the zero and one windows
        frame[9] = 1000;
        assert_eq!(decode_nec(&frame), None);
        assert_eq!(decode(&frame).protocol, Protocol::Raw);
    }

    #[test]
    fn nec_needs_all_bits() {
        let frame = nec_frame(0x1234_5678);
        assert_eq!(decode_nec(&frame[..40]), None);
        assert_eq!(decode_nec(&frame[..33]), None);
        assert_eq!(decode_nec(&frame[..66]), Some(0x1234_5678));
    }

    #[test]
    fn nec_header_tolerance() {
        let mut frame = nec_frame(1);
        frame[0] = 8000;
        frame[1] = 5000;
        assert_eq!(decode_nec(&frame), Some(1));
        frame[0] = 7999;
        assert_eq!(decode_nec(&frame), None);
    }

    #[test]
    fn sony_partial_frame() {
        // Header + 11 bits. Low bits 1, 0, 1
        let mut frame: heapless::Vec<u16, 128> = heapless::Vec::new();
        frame.extend_from_slice(&[2400, 600]).unwrap();
        frame.extend_from_slice(&[1200, 600, 600, 600, 1200, 600]).unwrap();
        for _ in 0..8 {
            frame.extend_from_slice(&[600, 600]).unwrap();
        }
        assert_eq!(frame.len(), 24);
        assert_eq!(decode_sony(&frame), Some(0b101));
    }

    #[test]
    fn sony_bad_mark_rejects() {
        let mut frame: heapless::Vec<u16, 128> = heapless::Vec::new();
        frame.extend_from_slice(&[2400, 600]).unwrap();
        for _ in 0..12 {
            frame.extend_from_slice(&[850, 600]).unwrap();
        }
        assert_eq!(decode_sony(&frame), None);
    }

    #[test]
    fn sony_too_short() {
        let frame = [2400, 600, 1200, 600, 600, 600];
        assert_eq!(decode_sony(&frame), None);
    }

    #[test]
    fn rc5_reads_all_ones() {
        let frame = [889u16; 28];
        assert_eq!(decode(&frame), ReceivedCode::decoded(Protocol::Rc5, 0x3FFF));
    }

    #[test]
    fn rc5_within_quarter_bit() {
        let mut frame = [889u16; 28];
        frame[3] = 667;
        frame[10] = 1111;
        assert_eq!(decode_rc5(&frame), Some(0x3FFF));
        frame[5] = 1778;
        assert_eq!(decode_rc5(&frame), None);
    }

    #[test]
    fn rc5_too_short() {
        assert_eq!(decode_rc5(&[889u16; 27]), None);
    }

    #[test]
    fn short_capture_is_raw() {
        let frame = [9000, 4500, 562, 562, 562, 1687, 562, 562, 562, 1687];
        assert_eq!(decode(&frame), ReceivedCode::decoded(Protocol::Raw, 0));
    }

    #[test]
    fn empty_capture_is_raw() {
        assert_eq!(decode(&[]).protocol, Protocol::Raw);
    }
}
