//! Simulated board for running the driver on a host.
//!
//! The clock only moves when told to, or by a fixed step on every clock read
//! when auto advance is set. Scheduled input edges fire as the clock passes
//! them, calling the registered handler like an interrupt would.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::hal::{EdgeHandler, EdgeMode, Hal, Level, Pin, PinMode};
use crate::pulse::PulseInterval;

#[derive(Default)]
struct Board {
    now_us: u64,
    tick_us: u64,
    levels: HashMap<Pin, Level>,
    modes: HashMap<Pin, PinMode>,
    /// Level changes of output pins
    writes: Vec<(u64, Pin, Level)>,
    handlers: HashMap<Pin, (EdgeMode, EdgeHandler)>,
    /// Future input edges, ordered by time
    pending: VecDeque<(u64, Pin)>,
}

impl Board {
    fn level(&self, pin: Pin) -> Level {
        self.levels.get(&pin).copied().unwrap_or(Level::Low)
    }

    /// Apply the first pending edge due at or before `until`
    fn pop_due(&mut self, until: u64) -> Option<(u64, Pin, Option<EdgeHandler>)> {
        match self.pending.front() {
            Some(&(ts, _)) if ts <= until => {}
            _ => return None,
        }
        let (ts, pin) = self.pending.pop_front()?;

        self.now_us = self.now_us.max(ts);
        let level = self.level(pin).toggled();
        self.levels.insert(pin, level);

        let handler = self.handlers.get(&pin).and_then(|(mode, handler)| {
            let fires = match mode {
                EdgeMode::Change => true,
                EdgeMode::Rising => level == Level::High,
                EdgeMode::Falling => level == Level::Low,
            };
            if fires {
                Some(*handler)
            } else {
                None
            }
        });

        Some((ts, pin, handler))
    }
}

#[derive(Clone, Default)]
pub struct SimHal {
    board: Rc<RefCell<Board>>,
}

impl SimHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock by `tick_us` on every clock read
    pub fn set_auto_advance(&self, tick_us: u64) {
        self.board.borrow_mut().tick_us = tick_us;
    }

    pub fn now(&self) -> u64 {
        self.board.borrow().now_us
    }

    /// Move the clock forward, firing the edges that come due
    pub fn advance(&self, us: u64) {
        let target = self.now() + us;
        self.run_until(target);
    }

    fn run_until(&self, target: u64) {
        loop {
            // Handlers run with the board released
            let due = self.board.borrow_mut().pop_due(target);
            match due {
                Some((ts, pin, Some(handler))) => handler(pin, ts),
                Some(_) => {}
                None => break,
            }
        }

        let mut board = self.board.borrow_mut();
        board.now_us = board.now_us.max(target);
    }

    /// Schedule an input edge at `ts`
    pub fn schedule_edge(&self, pin: Pin, ts: u64) {
        let mut board = self.board.borrow_mut();
        let pos = board
            .pending
            .iter()
            .position(|&(t, _)| t > ts)
            .unwrap_or(board.pending.len());
        board.pending.insert(pos, (ts, pin));
    }

    /// Schedule edges so that the input shows `intervals`, the first edge at `start`
    pub fn schedule_pulses(&self, pin: Pin, start: u64, intervals: &[PulseInterval]) {
        let mut ts = start;
        self.schedule_edge(pin, ts);
        for dt in intervals {
            ts += u64::from(*dt);
            self.schedule_edge(pin, ts);
        }
    }

    pub fn pending_edges(&self) -> usize {
        self.board.borrow().pending.len()
    }

    pub fn level(&self, pin: Pin) -> Level {
        self.board.borrow().level(pin)
    }

    pub fn mode(&self, pin: Pin) -> Option<PinMode> {
        self.board.borrow().modes.get(&pin).copied()
    }

    pub fn is_registered(&self, pin: Pin) -> bool {
        self.board.borrow().handlers.contains_key(&pin)
    }

    /// Level changes written to `pin`
    pub fn trace(&self, pin: Pin) -> Vec<(u64, Level)> {
        self.board
            .borrow()
            .writes
            .iter()
            .filter(|(_, p, _)| *p == pin)
            .map(|(ts, _, level)| (*ts, *level))
            .collect()
    }

    pub fn clear_trace(&self) {
        self.board.borrow_mut().writes.clear();
    }
}

impl Hal for SimHal {
    fn set_pin_mode(&mut self, pin: Pin, mode: PinMode) {
        self.board.borrow_mut().modes.insert(pin, mode);
    }

    fn write_pin(&mut self, pin: Pin, level: Level) {
        let mut board = self.board.borrow_mut();
        if board.level(pin) != level {
            let now = board.now_us;
            board.writes.push((now, pin, level));
            board.levels.insert(pin, level);
        }
    }

    fn read_pin(&self, pin: Pin) -> Level {
        self.level(pin)
    }

    fn now_micros(&self) -> u64 {
        let tick = self.board.borrow().tick_us;
        if tick > 0 {
            self.advance(tick);
        }
        self.now()
    }

    fn now_millis(&self) -> u64 {
        self.now_micros() / 1000
    }

    fn register_edge_notification(&mut self, pin: Pin, mode: EdgeMode, handler: EdgeHandler) {
        self.board.borrow_mut().handlers.insert(pin, (mode, handler));
    }

    fn unregister_edge_notification(&mut self, pin: Pin) {
        self.board.borrow_mut().handlers.remove(&pin);
    }
}

/// Recover mark/space intervals from the level changes of a carrier modulated output.
///
/// Highs closer than `gap_us` belong to the same mark.
pub fn demodulate(trace: &[(u64, Level)], gap_us: u64) -> Vec<PulseInterval> {
    fn interval(dt: u64) -> PulseInterval {
        PulseInterval::try_from(dt).unwrap_or(PulseInterval::MAX)
    }

    let mut out = Vec::new();
    let mut mark_start: Option<u64> = None;
    let mut last_fall: Option<u64> = None;

    for &(ts, level) in trace {
        match level {
            Level::High => match (mark_start, last_fall) {
                (None, _) => mark_start = Some(ts),
                (Some(start), Some(fall)) if ts - fall > gap_us => {
                    out.push(interval(fall - start));
                    out.push(interval(ts - fall));
                    mark_start = Some(ts);
                    last_fall = None;
                }
                _ => {}
            },
            Level::Low => {
                if mark_start.is_some() {
                    last_fall = Some(ts);
                }
            }
        }
    }

    if let (Some(start), Some(fall)) = (mark_start, last_fall) {
        out.push(interval(fall - start));
    }

    out
}
