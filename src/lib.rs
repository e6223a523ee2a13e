//! Host side tools around the irblip driver: vcd files and a simulated loopback.

use std::num::ParseIntError;

use irblip_driver::{Command, Protocol};

pub mod decode;
pub mod encode;
pub mod loopback;
pub mod vcdutils;

/// Decimal or `0x` prefixed hex
pub fn parse_code(s: &str) -> Result<u32, ParseIntError> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
}

pub fn parse_command(protocol: &str, code: u32) -> anyhow::Result<Command> {
    let protocol = Protocol::try_from(protocol)
        .map_err(|_| anyhow::anyhow!("Protocol: {} not found", protocol))?;

    Command::new(protocol, code)
        .ok_or_else(|| anyhow::anyhow!("Code {:#X} does not fit {}", code, protocol.name()))
}
