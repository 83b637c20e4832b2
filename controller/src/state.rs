//! Amplifier state and the idle-timeout watchdog.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::SettingsStore;
use crate::switch::PaSwitch;

struct PaState {
    on: bool,
    last_update: Option<Instant>,
    switch: Box<dyn PaSwitch>,
}

impl PaState {
    // Caller holds the controller lock.
    fn force_off(&mut self) {
        self.switch.send(false);
        self.on = false;
        self.last_update = None;
    }
}

/// Controls the duty cycle of the power amplifier.
///
/// One instance exists per process, shared (via `Arc`) between the command
/// server threads and the transceiver's polling loop. All mutation happens
/// under a single lock, so transitions from different callers are totally
/// ordered; the hardware command is issued inside the critical section as the
/// last step of a transition.
pub struct PaController {
    state: Mutex<PaState>,
    settings: Arc<SettingsStore>,
    clock: Box<dyn Clock>,
}

impl PaController {
    /// Controller starting in the OFF state, running on the system clock.
    pub fn new(switch: Box<dyn PaSwitch>, settings: Arc<SettingsStore>) -> Self {
        Self::with_clock(switch, settings, Box::new(SystemClock))
    }

    /// Controller with an explicit time source.
    pub fn with_clock(
        switch: Box<dyn PaSwitch>,
        settings: Arc<SettingsStore>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            state: Mutex::new(PaState {
                on: false,
                last_update: None,
                switch,
            }),
            settings,
            clock,
        }
    }

    /// Turn the amplifier on.
    ///
    /// With `refresh` the idle-timeout clock restarts even if the amplifier
    /// is already on. Without it, a call on an already-on amplifier does
    /// nothing at all, so a probing caller can never keep the PA alive by
    /// accident.
    pub fn turn_on(&self, refresh: bool) {
        let mut state = self.state.lock();
        if !state.on || refresh {
            info!("PA on");
            state.switch.send(true);
            state.on = true;
            state.last_update = Some(self.clock.now());
        }
    }

    /// Turn the amplifier off.
    ///
    /// Idempotent; the hardware off command is re-sent even when already off
    /// (the command itself is an idempotent reset).
    pub fn turn_off(&self) {
        let mut state = self.state.lock();
        info!("PA off");
        state.force_off();
    }

    /// Enforce the idle timeout and report the resulting on/off state.
    ///
    /// The transceiver calls this once per processing cycle, so an expired
    /// amplifier is shut off almost immediately rather than whenever the next
    /// remote probe happens to arrive. The timeout is re-read from settings on
    /// every call, so a configuration reload takes effect without a restart.
    pub fn update(&self) -> bool {
        let timeout = self.settings.timeout();
        let mut state = self.state.lock();
        if state.on {
            if let Some(last) = state.last_update {
                if self.clock.now().saturating_duration_since(last) > timeout {
                    warn!("PA idle timeout expired, forcing off");
                    state.force_off();
                }
            }
        }
        state.on
    }
}
