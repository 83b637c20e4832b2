//! Types that travel between the PA controller daemon and its clients
#![no_std]

use serde::{Deserialize, Serialize};

/// Commands a client may issue to the controller
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Command {
    /// Turn the amplifier on, refreshing the idle-timeout clock
    On,
    /// Turn the amplifier off
    Off,
    /// Query the current on/off state (runs a watchdog check first)
    Status,
}

/// Replies from the controller
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub enum Response {
    /// The command was applied
    Ack,
    /// Current logical state of the amplifier, answered to [`Command::Status`]
    Status(bool),
}
