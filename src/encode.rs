use std::fs::File;
use std::path::Path;

use irblip_driver::{encoder, Command, PulseSequence};

use crate::vcdutils::VcdWriter;

/// Encode `cmd`, optionally writing the frame to a vcd file
pub fn command(cmd: Command, path: Option<&Path>) -> anyhow::Result<PulseSequence> {
    let frame = encoder::encode(cmd);
    log::debug!("{} {:?}: {} intervals", cmd.protocol().name(), cmd, frame.len());

    if let Some(path) = path {
        let file = File::create(path)?;
        let mut writer = VcdWriter::new(file);
        writer.init()?;
        writer.write_intervals(&frame)?;
        log::info!("Wrote {}", path.display());
    }

    Ok(frame)
}
