use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use postcard::{
    accumulator::{CobsAccumulator, FeedResult},
    to_slice_cobs,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of the PA controller daemon
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Turns the PA on and refreshes its idle timeout
    On,
    /// Turns the PA off
    Off,
    /// Queries the current PA state
    Status,
}

/// Write a command to the daemon (COBS) and wait for the response
fn write_read(
    cmd: &transport::Command,
    stream: &mut TcpStream,
) -> anyhow::Result<transport::Response> {
    let mut buf = [0u8; 64];
    let s = to_slice_cobs(cmd, &mut buf).context("Failed to encode command")?;
    stream.write_all(s).context("Failed to send command")?;

    // Bytes per read
    let mut raw_buf = [0u8; 256];
    // Bytes in the accumulator (COBS)
    let mut cobs_buf: CobsAccumulator<256> = CobsAccumulator::new();
    // Keep truckin until we've got a response
    while let Ok(n) = stream.read(&mut raw_buf) {
        if n == 0 {
            // We're done reading
            break;
        }
        let buf = &raw_buf[..n];
        let mut window = buf;
        'cobs: while !window.is_empty() {
            window = match cobs_buf.feed::<transport::Response>(window) {
                FeedResult::Consumed => break 'cobs,
                FeedResult::OverFull(new_wind) => new_wind,
                FeedResult::DeserError(new_wind) => new_wind,
                FeedResult::Success { data, remaining: _ } => return Ok(data),
            };
        }
    }
    bail!("Connection closed before a response arrived")
}

fn main() -> anyhow::Result<()> {
    // Parse the CLI
    let cli = Cli::parse();
    // Try to connect to the daemon
    let mut stream = TcpStream::connect(&cli.addr)
        .with_context(|| format!("Failed to connect to {}", cli.addr))?;
    stream.set_read_timeout(Some(Duration::from_millis(1000)))?;
    // Dispatch on action
    let cmd = match cli.command {
        Command::On => transport::Command::On,
        Command::Off => transport::Command::Off,
        Command::Status => transport::Command::Status,
    };
    match write_read(&cmd, &mut stream)? {
        transport::Response::Ack => println!("ok"),
        transport::Response::Status(on) => println!("{}", if on { "on" } else { "off" }),
    }
    Ok(())
}
