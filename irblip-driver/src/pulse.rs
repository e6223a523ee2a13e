//! Pulse timings and the capture buffer fed by edge notifications.

/// Duration of one mark or space in microseconds
pub type PulseInterval = u16;

/// Maximum number of intervals in a sequence
pub const SEQUENCE_CAPACITY: usize = 128;

/// Number of intervals after which a capture is considered complete
pub const CAPTURE_LIMIT: usize = SEQUENCE_CAPACITY - 1;

pub const DEFAULT_MIN_PULSE_WIDTH: u16 = 50;
pub const DEFAULT_MAX_PULSE_WIDTH: u16 = 10_000;

/// Alternating mark/space intervals, starting with a mark.
/// Even indices are marks, odd indices are spaces.
pub type PulseSequence = heapless::Vec<PulseInterval, SEQUENCE_CAPACITY>;

pub fn is_mark(index: usize) -> bool {
    index % 2 == 0
}

/// Live capture of one receive pin.
///
/// Written from the edge path, read from the foreground. Callers serialize
/// the two sides, see [`crate::channel`].
#[derive(Debug)]
pub struct CaptureBuffer {
    samples: PulseSequence,
    capturing: bool,
    ready: bool,
    last_edge: Option<u64>,
    min_width: u16,
    max_width: u16,
}

impl Default for CaptureBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBuffer {
    pub const fn new() -> Self {
        Self {
            samples: heapless::Vec::new(),
            capturing: false,
            ready: false,
            last_edge: None,
            min_width: DEFAULT_MIN_PULSE_WIDTH,
            max_width: DEFAULT_MAX_PULSE_WIDTH,
        }
    }

    /// Clear the previous capture and start accepting edges
    pub fn arm(&mut self) {
        self.samples.clear();
        self.last_edge = None;
        self.ready = false;
        self.capturing = true;
    }

    /// Stop accepting edges, keeping what was captured
    pub fn disarm(&mut self) {
        self.capturing = false;
        self.ready = false;
    }

    pub fn set_limits(&mut self, min_width: u16, max_width: u16) {
        self.min_width = min_width;
        self.max_width = max_width;
    }

    /// Register an edge at `ts` microseconds. Returns true if an interval was stored.
    ///
    /// Intervals outside the pulse width limits are dropped as noise.
    pub fn sample(&mut self, ts: u64) -> bool {
        if !self.capturing || self.samples.len() >= CAPTURE_LIMIT {
            return false;
        }

        let stored = match self.last_edge.replace(ts) {
            Some(prev) => {
                let dt = ts.wrapping_sub(prev);
                if dt >= u64::from(self.min_width) && dt <= u64::from(self.max_width) {
                    // max_width is a u16, so dt fits
                    self.samples.push(dt as PulseInterval).is_ok()
                } else {
                    false
                }
            }
            None => false,
        };

        if self.samples.len() >= CAPTURE_LIMIT {
            self.capturing = false;
            self.ready = true;
        }

        stored
    }

    /// End the frame if the line has been quiet for longer than `gap` microseconds.
    ///
    /// `now` may be older than the last edge when an edge lands after the
    /// clock was read. Such a line is not quiet.
    pub fn check_idle(&mut self, now: u64, gap: u64) -> bool {
        if self.capturing && !self.samples.is_empty() {
            if let Some(last) = self.last_edge {
                let quiet = now.wrapping_sub(last);
                if quiet <= u64::MAX / 2 && quiet > gap {
                    self.capturing = false;
                    self.ready = true;
                }
            }
        }
        self.ready
    }

    /// Copy the finished capture into `out` and stop capturing
    pub fn take(&mut self, out: &mut PulseSequence) {
        out.clear();
        // Same capacity on both sides
        let _ = out.extend_from_slice(&self.samples);
        self.capturing = false;
        self.ready = false;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[PulseInterval] {
        &self.samples
    }
}
