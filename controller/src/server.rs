//! TCP command server.
//!
//! Clients send COBS-framed postcard [`Command`]s and get a [`Response`] per
//! command back on the same connection. Frames that fail to decode are
//! skipped and the connection stays open. The state lock is never held across
//! socket I/O; each command is dispatched, answered, and done.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use postcard::{
    accumulator::{CobsAccumulator, FeedResult},
    to_slice_cobs,
};
use tracing::{debug, info, warn};
use transport::{Command, Response};

use crate::state::PaController;

/// Accept loop. One thread per client; the expected client count is tiny
/// (the base station controller plus the occasional operator CLI).
pub fn serve(listener: TcpListener, controller: Arc<PaController>) -> std::io::Result<()> {
    info!(addr = %listener.local_addr()?, "PA command server listening");
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let controller = Arc::clone(&controller);
                thread::spawn(move || handle_client(stream, controller));
            }
            Err(e) => warn!(error = %e, "failed to accept connection"),
        }
    }
    Ok(())
}

fn handle_client(mut stream: TcpStream, controller: Arc<PaController>) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".into());
    debug!(%peer, "client connected");
    let mut raw_buf = [0u8; 256];
    let mut cobs_buf: CobsAccumulator<256> = CobsAccumulator::new();
    while let Ok(n) = stream.read(&mut raw_buf) {
        if n == 0 {
            break;
        }
        let mut window = &raw_buf[..n];
        'cobs: while !window.is_empty() {
            window = match cobs_buf.feed::<Command>(window) {
                FeedResult::Consumed => break 'cobs,
                FeedResult::OverFull(new_wind) => new_wind,
                FeedResult::DeserError(new_wind) => {
                    warn!(%peer, "dropping malformed command frame");
                    new_wind
                }
                FeedResult::Success {
                    data: cmd,
                    remaining,
                } => {
                    debug!(%peer, ?cmd, "handling command");
                    let resp = dispatch(cmd, &controller);
                    let mut out_buf = [0u8; 64];
                    match to_slice_cobs(&resp, &mut out_buf) {
                        Ok(frame) => {
                            if let Err(e) = stream.write_all(frame) {
                                warn!(%peer, error = %e, "failed to write response");
                                return;
                            }
                        }
                        Err(e) => warn!(error = %e, "failed to encode response"),
                    }
                    remaining
                }
            };
        }
    }
    debug!(%peer, "client disconnected");
}

fn dispatch(cmd: Command, controller: &PaController) -> Response {
    match cmd {
        Command::On => {
            controller.turn_on(true);
            Response::Ack
        }
        Command::Off => {
            controller.turn_off();
            Response::Ack
        }
        Command::Status => Response::Status(controller.update()),
    }
}
