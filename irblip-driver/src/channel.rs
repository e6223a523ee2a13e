//! Pin keyed capture channels.
//!
//! Edge notifications carry no instance context, only the pin that fired.
//! Receivers bind a channel for their pin, and [`on_edge`] is the handler
//! given to the peripheral. Both sides reach a channel only inside a critical
//! section, so the foreground copy of a capture never overlaps a write.

use core::cell::RefCell;

use critical_section::Mutex;

use crate::error::Error;
use crate::hal::Pin;
use crate::pulse::CaptureBuffer;

/// Number of receivers that can be live at the same time
pub const MAX_CHANNELS: usize = 16;

#[derive(Debug)]
struct Channel {
    pin: Pin,
    capture: CaptureBuffer,
}

const UNBOUND: Option<Channel> = None;

pub struct ChannelTable<const N: usize> {
    slots: Mutex<RefCell<[Option<Channel>; N]>>,
}

impl<const N: usize> ChannelTable<N> {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([UNBOUND; N])),
        }
    }

    /// Claim a channel for `pin`
    pub fn bind(&self, pin: Pin) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow(cs).borrow_mut();

            if slots.iter().flatten().any(|ch| ch.pin == pin) {
                return Err(Error::PinInUse(pin));
            }

            let free = slots
                .iter_mut()
                .find(|slot| slot.is_none())
                .ok_or(Error::NoFreeChannel)?;

            *free = Some(Channel {
                pin,
                capture: CaptureBuffer::new(),
            });
            Ok(())
        })
    }

    pub fn release(&self, pin: Pin) {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow(cs).borrow_mut();
            for slot in slots.iter_mut() {
                if slot.as_ref().map_or(false, |ch| ch.pin == pin) {
                    *slot = None;
                }
            }
        })
    }

    pub fn is_bound(&self, pin: Pin) -> bool {
        self.with(pin, |_| ()).is_ok()
    }

    /// Run `f` on the capture of `pin` with edge writes held off
    pub fn with<R>(&self, pin: Pin, f: impl FnOnce(&mut CaptureBuffer) -> R) -> Result<R, Error> {
        critical_section::with(|cs| {
            let mut slots = self.slots.borrow(cs).borrow_mut();
            slots
                .iter_mut()
                .flatten()
                .find(|ch| ch.pin == pin)
                .map(|ch| f(&mut ch.capture))
                .ok_or(Error::NotBound(pin))
        })
    }

    /// Route an edge to the channel bound to `pin`, if any
    pub fn dispatch(&self, pin: Pin, ts: u64) {
        let _ = self.with(pin, |capture| capture.sample(ts));
    }
}

/// The channels used by [`crate::Receiver`]
pub static CHANNELS: ChannelTable<MAX_CHANNELS> = ChannelTable::new();

/// Edge handler for every receive pin
pub fn on_edge(pin: Pin, ts: u64) {
    CHANNELS.dispatch(pin, ts);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_is_exclusive_per_pin() {
        let table: ChannelTable<2> = ChannelTable::new();
        assert_eq!(table.bind(4), Ok(()));
        assert_eq!(table.bind(4), Err(Error::PinInUse(4)));
        assert_eq!(table.bind(5), Ok(()));
        assert_eq!(table.bind(6), Err(Error::NoFreeChannel));

        table.release(4);
        assert!(!table.is_bound(4));
        assert_eq!(table.bind(6), Ok(()));
    }

    #[test]
    fn dispatch_routes_by_pin() {
        let table: ChannelTable<2> = ChannelTable::new();
        table.bind(1).unwrap();
        table.bind(2).unwrap();
        table.with(1, |c| c.arm()).unwrap();
        table.with(2, |c| c.arm()).unwrap();

        table.dispatch(1, 0);
        table.dispatch(1, 900);
        table.dispatch(2, 0);
        table.dispatch(2, 600);
        table.dispatch(2, 1200);
        // Unbound pin is ignored
        table.dispatch(3, 100);

        assert_eq!(table.with(1, |c| c.len()), Ok(1));
        assert_eq!(table.with(2, |c| c.len()), Ok(2));
        assert_eq!(table.with(3, |c| c.len()), Err(Error::NotBound(3)));
    }

    #[test]
    fn released_pin_stops_capturing() {
        let table: ChannelTable<1> = ChannelTable::new();
        table.bind(9).unwrap();
        table.with(9, |c| c.arm()).unwrap();
        table.release(9);

        table.dispatch(9, 0);
        table.dispatch(9, 1000);

        table.bind(9).unwrap();
        assert_eq!(table.with(9, |c| c.is_empty()), Ok(true));
    }

    #[test]
    fn sixteen_receivers_at_most() {
        assert_eq!(MAX_CHANNELS, 16);

        let table: ChannelTable<MAX_CHANNELS> = ChannelTable::new();
        for pin in 0..MAX_CHANNELS as Pin {
            assert_eq!(table.bind(pin), Ok(()));
        }
        assert_eq!(table.bind(200), Err(Error::NoFreeChannel));
    }
}
