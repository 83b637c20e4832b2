//! Duty-cycle controller for the transceiver's power amplifier.
//!
//! The amplifier is switched on and off over a serial control line and is
//! guarded by an idle-timeout watchdog: if nothing refreshes the PA for the
//! configured number of seconds, it is forced off. The transceiver's
//! signal-processing loop drives the watchdog by calling
//! [`PaController::update`] once per cycle, while remote `on`/`off`/`status`
//! commands arrive over TCP on a separate thread.

pub mod clock;
pub mod config;
pub mod server;
pub mod state;
pub mod switch;

pub use config::{Settings, SettingsStore};
pub use state::PaController;
