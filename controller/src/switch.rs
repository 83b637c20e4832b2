//! Hardware control line for the amplifier.

use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, warn};

// Command strings understood by the amplifier's control board.
const ON_CMD: &[u8] = b"O0=1\r";
const OFF_CMD: &[u8] = b"O0=0\r";

const PA_BAUD: u32 = 115_200;

/// The physical on/off line to the amplifier.
///
/// Sends are fire-and-forget: a failed write is logged and the logical state
/// keeps whatever the caller asked for. Implementations must never block for
/// long, since commands are issued while the state lock is held.
pub trait PaSwitch: Send {
    fn send(&mut self, on: bool);
}

/// Drives the amplifier over a serial control line.
pub struct SerialSwitch {
    port: Box<dyn SerialPort>,
}

impl SerialSwitch {
    /// Open the control line at `device` (115200 baud).
    pub fn open(device: &str) -> Result<Self, serialport::Error> {
        let port = serialport::new(device, PA_BAUD)
            .timeout(Duration::from_millis(1000))
            .open()?;
        Ok(Self { port })
    }
}

impl PaSwitch for SerialSwitch {
    fn send(&mut self, on: bool) {
        let cmd = if on { ON_CMD } else { OFF_CMD };
        match self.port.write_all(cmd) {
            Ok(()) => debug!(on, "sent PA command"),
            Err(e) => warn!(on, error = %e, "PA command write failed"),
        }
    }
}

/// Stand-in for deployments where the radio front-end powers the PA itself
/// and there is nothing for us to drive.
pub struct NoopSwitch;

impl PaSwitch for NoopSwitch {
    fn send(&mut self, on: bool) {
        warn!(on, "no PA control line configured, command dropped");
    }
}
