//! Modbus ADU Demo
//!
//! Builds one request and prints it in every envelope:
//!
//! ```text
//! adu_demo 1 16 0 10 20 30
//! ```
//!
//! FC15/FC16 take every value; other codes use the first value as the count
//! or the value to write.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use modbus_adu::utils::format::{ascii_frame_to_text, bytes_to_dec, bytes_to_hex};
use modbus_adu::{EngineConfig, EnvelopeKind, ModbusRequest};

#[derive(Parser, Debug)]
#[command(
    name = "adu_demo",
    version,
    about = "Print a Modbus request in RTU, TCP, Over-TCP and ASCII envelopes",
    allow_negative_numbers = true
)]
struct Cli {
    /// Device (slave) id
    device: u8,

    /// Function code (1-6, 15, 16)
    function: u8,

    /// First coil or register
    address: i32,

    /// Count, value, or list of values for FC15/FC16
    values: Vec<i32>,

    /// JSON or YAML engine configuration
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let request = ModbusRequest::from_parts(cli.device, cli.function, cli.address, &cli.values)
        .context("building request")?;
    info!(device = request.device_id, function = %request.function(), "encoding request");

    let framer = config.framer();
    let pdu = request.to_pdu();

    for kind in EnvelopeKind::ALL {
        let frame = framer.wrap(kind, &pdu);
        println!("{kind} HEX: {}", bytes_to_hex(&frame));
        println!("{kind} DEC: {}", bytes_to_dec(&frame));
        if kind == EnvelopeKind::Ascii {
            println!("{kind} TEXT: {}", ascii_frame_to_text(&frame));
        }
    }

    Ok(())
}
