use std::fs::File;
use std::io::{self, BufReader, ErrorKind::InvalidInput, Write};
use std::path::Path;

use irblip_driver::PulseInterval;
use vcd::{self, SimulationCommand, TimescaleUnit, Value};

/// Time between frames written by the same writer
pub const FRAME_GAP_US: u64 = 50_000;

pub struct VcdWriter<W: Write> {
    vcd: vcd::Writer<W>,
    timestamp: u64,
    wire_id: vcd::IdCode,
}

impl<W: Write> VcdWriter<W> {
    pub fn new(w: W) -> Self {
        Self {
            vcd: vcd::Writer::new(w),
            timestamp: 0,
            wire_id: vcd::IdCode::FIRST,
        }
    }

    /// Header with a single `top.ir` wire, 1 µs per tick
    pub fn init(&mut self) -> io::Result<()> {
        let writer = &mut self.vcd;

        writer.timescale(1, TimescaleUnit::US)?;
        writer.add_module("top")?;
        let id = writer.add_wire(1, "ir")?;
        self.wire_id = id;
        writer.upscope()?;
        writer.enddefinitions()?;

        writer.begin(SimulationCommand::Dumpvars)?;
        writer.change_scalar(id, Value::V0)?;
        writer.end()?;

        Ok(())
    }

    /// Write one frame of mark/space intervals, starting with a mark.
    ///
    /// A frame ending on a space is closed by releasing the wire (`z`).
    pub fn write_intervals(&mut self, intervals: &[PulseInterval]) -> io::Result<()> {
        let mut ts = 0;
        self.write_value(ts, Value::V1)?;

        for (i, dt) in intervals.iter().enumerate() {
            ts += u64::from(*dt);
            let value = match (i % 2, i + 1 == intervals.len()) {
                (0, _) => Value::V0,
                (_, true) => Value::Z,
                (_, false) => Value::V1,
            };
            self.write_value(ts, value)?;
        }

        self.timestamp += ts + FRAME_GAP_US;
        Ok(())
    }

    fn write_value(&mut self, ts: u64, value: Value) -> io::Result<()> {
        self.vcd.timestamp(self.timestamp + ts)?;
        self.vcd.change_scalar(self.wire_id, value)?;
        Ok(())
    }
}

/// Multiplier from `scale unit` ticks to microseconds, as a fraction
fn ticks_to_us(timescale: Option<(u32, TimescaleUnit)>) -> io::Result<(u64, u64)> {
    let (scale, unit) = timescale.unwrap_or((1, TimescaleUnit::US));
    let scale = u64::from(scale);

    Ok(match unit {
        TimescaleUnit::S => (scale * 1_000_000, 1),
        TimescaleUnit::MS => (scale * 1_000, 1),
        TimescaleUnit::US => (scale, 1),
        TimescaleUnit::NS => (scale, 1_000),
        unit => {
            return Err(io::Error::new(
                InvalidInput,
                format!("unsupported timescale {:?}", unit),
            ))
        }
    })
}

/// Read the `top.ir` wire as intervals between its level changes, starting at
/// the first rising edge. Releasing the wire ends the interval before it.
pub fn vcdfile_to_intervals(path: &Path) -> io::Result<Vec<PulseInterval>> {
    let file = File::open(path)?;
    let mut parser = vcd::Parser::new(BufReader::new(file));

    let header = parser.parse_header()?;
    let wire = header
        .find_var(&["top", "ir"])
        .ok_or_else(|| io::Error::new(InvalidInput, "no wire top.ir"))?
        .code;

    let (mul, div) = ticks_to_us(header.timescale)?;
    log::debug!("timescale: {:?}", header.timescale);

    let mut current_ts = 0;
    let mut level = Value::V0;
    let mut last_change: Option<u64> = None;
    let mut res = Vec::new();

    for command_result in parser {
        use vcd::Command::*;
        match command_result? {
            Timestamp(ts) => current_ts = ts * mul / div,
            ChangeScalar(id, value) if id == wire && value != level => {
                level = value;
                match last_change {
                    Some(prev) => {
                        let dt = current_ts.saturating_sub(prev);
                        res.push(PulseInterval::try_from(dt).unwrap_or(PulseInterval::MAX));
                        last_change = Some(current_ts);
                    }
                    None if value == Value::V1 => last_change = Some(current_ts),
                    None => {}
                }
            }
            _ => (),
        }
    }

    Ok(res)
}
