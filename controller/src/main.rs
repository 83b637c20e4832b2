use std::net::TcpListener;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use controller::config::SwitchBackend;
use controller::switch::{NoopSwitch, PaSwitch, SerialSwitch};
use controller::{server, PaController, Settings, SettingsStore};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file (defaults apply if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn open_switch(settings: &Settings) -> Box<dyn PaSwitch> {
    match settings.switch_backend {
        SwitchBackend::Noop => Box::new(NoopSwitch),
        SwitchBackend::Serial => match SerialSwitch::open(&settings.serial_device) {
            Ok(switch) => Box::new(switch),
            Err(e) => {
                // Keep running: the logical state machine still works, the
                // operator just gets told loudly that nothing is driven.
                warn!(
                    device = %settings.serial_device,
                    error = %e,
                    "failed to open PA control line, commands will be dropped"
                );
                Box::new(NoopSwitch)
            }
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => {
            Settings::load(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Settings::default(),
    };

    let switch = open_switch(&settings);
    let settings = Arc::new(SettingsStore::new(settings));
    let controller = Arc::new(PaController::new(switch, Arc::clone(&settings)));

    let port = settings.snapshot().rpc_port;
    let listener = TcpListener::bind(("0.0.0.0", port))
        .with_context(|| format!("binding command server to port {port}"))?;
    let server_controller = Arc::clone(&controller);
    thread::spawn(move || {
        if let Err(e) = server::serve(listener, server_controller) {
            error!(error = %e, "command server stopped");
        }
    });

    // The transceiver turns the PA on once its chain is up; without a
    // refresh it still falls to the watchdog.
    controller.turn_on(false);

    // Stand-in for the transceiver's signal-processing loop. When the
    // controller is embedded, the transceiver calls update() once per
    // processing cycle instead.
    loop {
        controller.update();
        thread::sleep(Duration::from_millis(settings.snapshot().poll_interval_ms));
    }
}
