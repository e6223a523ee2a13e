use std::path::Path;

use irblip_driver::decoder;
use irblip_driver::pulse::DEFAULT_MAX_PULSE_WIDTH;
use irblip_driver::{PulseInterval, ReceivedCode};

use crate::vcdutils::vcdfile_to_intervals;

/// Split a recording into frames at spaces longer than `max_gap`
pub fn split_frames(intervals: &[PulseInterval], max_gap: PulseInterval) -> Vec<&[PulseInterval]> {
    intervals
        .split(|dt| *dt > max_gap)
        .filter(|frame| !frame.is_empty())
        .collect()
}

/// Decode every frame found in a vcd recording
pub fn command(path: &Path) -> anyhow::Result<Vec<ReceivedCode>> {
    let intervals = vcdfile_to_intervals(path)?;
    log::debug!("{} intervals in {}", intervals.len(), path.display());

    let codes = split_frames(&intervals, DEFAULT_MAX_PULSE_WIDTH)
        .into_iter()
        .map(|frame| {
            log::debug!("frame: {:?}", frame);
            decoder::decode(frame)
        })
        .collect();

    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_split_on_long_spaces() {
        let v = [900, 900, 900, 50_000, 600, 600, 20_000];
        let frames = split_frames(&v, 10_000);
        assert_eq!(frames, vec![&[900, 900, 900][..], &[600, 600][..]]);
    }
}
