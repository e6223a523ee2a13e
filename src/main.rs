use std::path::PathBuf;

use structopt::StructOpt;

use irblip::{decode, encode, loopback::Loopback, parse_code, parse_command};

#[derive(Debug, StructOpt)]
#[structopt(name = "irblip", about = "Infrared pulse encoder, decoder and loopback")]
struct Opt {
    #[structopt(short, long)]
    debug: bool,
    #[structopt(subcommand)]
    cmd: CliCommand,
}

#[derive(StructOpt, Debug)]
enum CliCommand {
    /// Encode a command. Optionally write it to a vcd file
    Encode {
        /// nec sony rc5
        protocol: String,
        #[structopt(parse(try_from_str = parse_code))]
        code: u32,
        #[structopt(parse(from_os_str))]
        path: Option<PathBuf>,
    },
    /// Decode the frames of a vcd file
    Decode {
        #[structopt(parse(from_os_str))]
        path: PathBuf,
    },
    /// Transmit and receive through the simulated board
    Loopback {
        /// nec sony rc5
        protocol: String,
        #[structopt(parse(try_from_str = parse_code))]
        code: u32,
        #[structopt(long, default_value = "0")]
        repeat: u8,
    },
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    let loglevel = if opt.debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new().filter_level(loglevel).init();

    match opt.cmd {
        CliCommand::Encode {
            protocol,
            code,
            path,
        } => {
            let cmd = parse_command(&protocol, code)?;
            let frame = encode::command(cmd, path.as_deref())?;
            println!("{:?}", frame);
        }
        CliCommand::Decode { path } => {
            for code in decode::command(&path)? {
                println!("{} {:#X} valid: {}", code.protocol.name(), code.value, code.valid);
            }
        }
        CliCommand::Loopback {
            protocol,
            code,
            repeat,
        } => {
            let cmd = parse_command(&protocol, code)?;
            let codes = Loopback::default().run(cmd, repeat)?;
            if codes.is_empty() {
                log::warn!("Nothing received");
            }
            for code in codes {
                println!("{} {:#X} valid: {}", code.protocol.name(), code.value, code.valid);
            }
        }
    }

    Ok(())
}
