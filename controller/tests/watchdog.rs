//! State-machine and watchdog behavior of the PA controller.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use controller::clock::Clock;
use controller::switch::PaSwitch;
use controller::{PaController, Settings, SettingsStore};

/// Manually advanced clock so expiry can be tested without sleeping.
#[derive(Clone)]
struct ManualClock {
    start: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    fn advance(&self, d: Duration) {
        *self.offset.lock() += d;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.start + *self.offset.lock()
    }
}

/// Records every hardware command instead of driving anything.
#[derive(Clone, Default)]
struct RecordingSwitch {
    sent: Arc<Mutex<Vec<bool>>>,
}

impl RecordingSwitch {
    fn sent(&self) -> Vec<bool> {
        self.sent.lock().clone()
    }
}

impl PaSwitch for RecordingSwitch {
    fn send(&mut self, on: bool) {
        self.sent.lock().push(on);
    }
}

/// Hardware that silently ignores every command, like an unplugged control
/// board.
struct DeadSwitch;

impl PaSwitch for DeadSwitch {
    fn send(&mut self, _on: bool) {}
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

fn controller_with_timeout(
    timeout_secs: u64,
) -> (PaController, ManualClock, RecordingSwitch, Arc<SettingsStore>) {
    let clock = ManualClock::new();
    let switch = RecordingSwitch::default();
    let settings = Arc::new(SettingsStore::new(Settings {
        timeout_secs,
        ..Settings::default()
    }));
    let controller = PaController::with_clock(
        Box::new(switch.clone()),
        Arc::clone(&settings),
        Box::new(clock.clone()),
    );
    (controller, clock, switch, settings)
}

#[test]
fn default_timeout_forces_off_after_301_seconds() {
    // Scenario A: on at t=0, still on at t=299, off at t=301.
    let (pa, clock, switch, _) = controller_with_timeout(300);
    pa.turn_on(true);
    clock.advance(secs(299));
    assert!(pa.update());
    clock.advance(secs(2));
    assert!(!pa.update());
    assert_eq!(switch.sent(), vec![true, false]);
}

#[test]
fn timeout_boundary_is_exclusive() {
    // Expiry requires now to be strictly past last_update + timeout.
    let (pa, clock, _, _) = controller_with_timeout(300);
    pa.turn_on(true);
    clock.advance(secs(300));
    assert!(pa.update());
    clock.advance(Duration::from_millis(1));
    assert!(!pa.update());
}

#[test]
fn zero_timeout_expires_on_first_late_poll() {
    let (pa, clock, _, _) = controller_with_timeout(0);
    pa.turn_on(true);
    assert!(pa.update());
    clock.advance(Duration::from_millis(1));
    assert!(!pa.update());
}

#[test]
fn refresh_resets_the_idle_clock() {
    // P2: a refresh at t=5 moves expiry to t=15.
    let (pa, clock, _, _) = controller_with_timeout(10);
    pa.turn_on(true);
    clock.advance(secs(5));
    pa.turn_on(true);
    clock.advance(secs(6)); // t=11, past the original expiry
    assert!(pa.update());
    clock.advance(secs(5)); // t=16, past the refreshed expiry
    assert!(!pa.update());
}

#[test]
fn off_is_idempotent_and_resends_the_command() {
    // P3: both calls land on the hardware, state stays consistent.
    let (pa, _, switch, _) = controller_with_timeout(300);
    pa.turn_off();
    pa.turn_off();
    assert!(!pa.update());
    assert_eq!(switch.sent(), vec![false, false]);
}

#[test]
fn polling_never_turns_on() {
    // P4, off half: the watchdog alone cannot power the amplifier.
    let (pa, clock, switch, _) = controller_with_timeout(300);
    for _ in 0..100 {
        assert!(!pa.update());
        clock.advance(secs(10));
    }
    assert!(switch.sent().is_empty());
}

#[test]
fn polling_never_refreshes_the_clock() {
    // P4, on half: heavy polling must not postpone expiry.
    let (pa, clock, _, _) = controller_with_timeout(10);
    pa.turn_on(true);
    for _ in 0..10 {
        clock.advance(secs(1));
        pa.update();
    }
    // t=10, still within the timeout
    assert!(pa.update());
    clock.advance(secs(1)); // t=11, expired relative to the original turn-on
    assert!(!pa.update());
}

#[test]
fn turn_on_without_refresh_from_off_sets_the_clock() {
    // Scenario B: from OFF, refresh=false behaves exactly like refresh=true.
    let (pa, clock, switch, _) = controller_with_timeout(10);
    pa.turn_on(false);
    assert!(pa.update());
    assert_eq!(switch.sent(), vec![true]);
    clock.advance(secs(11));
    assert!(!pa.update());
}

#[test]
fn turn_on_without_refresh_while_on_is_a_noop() {
    // Scenario C: no hardware command, no timestamp change.
    let (pa, clock, switch, _) = controller_with_timeout(10);
    pa.turn_on(true);
    clock.advance(secs(5));
    pa.turn_on(false);
    assert_eq!(switch.sent(), vec![true]);
    // Expiry still keys off the original turn-on at t=0.
    clock.advance(secs(6));
    assert!(!pa.update());
}

#[test]
fn explicit_on_after_forced_shutdown_works() {
    let (pa, clock, switch, _) = controller_with_timeout(10);
    pa.turn_on(true);
    clock.advance(secs(11));
    assert!(!pa.update());
    pa.turn_on(true);
    assert!(pa.update());
    assert_eq!(switch.sent(), vec![true, false, true]);
}

#[test]
fn timeout_reconfiguration_applies_without_restart() {
    let (pa, clock, _, settings) = controller_with_timeout(300);
    pa.turn_on(true);
    clock.advance(secs(5));
    assert!(pa.update());
    settings.replace(Settings {
        timeout_secs: 2,
        ..Settings::default()
    });
    // 5 seconds elapsed already exceeds the new 2 second timeout.
    assert!(!pa.update());
}

#[test]
fn logical_state_tracks_requests_even_when_hardware_is_dead() {
    // Sends are fire-and-forget: an unresponsive control board does not stop
    // the state store from reflecting what was asked for.
    let clock = ManualClock::new();
    let settings = Arc::new(SettingsStore::new(Settings::default()));
    let pa = PaController::with_clock(Box::new(DeadSwitch), settings, Box::new(clock.clone()));
    pa.turn_on(true);
    assert!(pa.update());
    pa.turn_off();
    assert!(!pa.update());
}

#[test]
fn concurrent_callers_leave_a_consistent_state() {
    // P5: hammer the controller from several threads; afterwards the state
    // must behave like some serialization of those calls. In particular an ON
    // result must still expire, proving the timestamp was recorded with it.
    let (pa, clock, _, _) = controller_with_timeout(60);
    let pa = Arc::new(pa);

    let mut handles = Vec::new();
    for i in 0..8 {
        let pa = Arc::clone(&pa);
        handles.push(thread::spawn(move || {
            for j in 0..200 {
                match (i + j) % 4 {
                    0 => pa.turn_on(true),
                    1 => pa.turn_on(false),
                    2 => pa.turn_off(),
                    _ => {
                        pa.update();
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    if pa.update() {
        // last_update must have been set along with the on flag
        clock.advance(secs(61));
        assert!(!pa.update());
    } else {
        clock.advance(secs(61));
        assert!(!pa.update());
    }
}
