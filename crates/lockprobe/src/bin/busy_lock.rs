//! # Busy Lock
//!
//! Runs one contention probe and exits with its verdict.
//!
//! ```bash
//! # Defaults: inflate monitor = true, hold = 1000 ms
//! ./busy_lock
//!
//! # Skip inflation, hold for 50 ms
//! ./busy_lock false 50
//!
//! # Settings from a TOML file
//! ./busy_lock --config probe.toml
//!
//! # More detail
//! RUST_LOG=lockprobe=debug ./busy_lock
//! ```
//!
//! Exit status: 0 pass, 1 failed run, 2 configuration error.

use std::process::ExitCode;

use lockprobe::report::EXIT_CONFIGURATION;
use lockprobe::{
    ContentionProbe, OutcomeReporter, ParkingInflation, ProbeConfig, ProbeError, ProbeResult,
    TracingReporter,
};
use tracing_subscriber::{fmt, EnvFilter};

fn resolve_config(args: &[String]) -> ProbeResult<ProbeConfig> {
    match args {
        [flag, path] if flag == "--config" => ProbeConfig::load(path),
        [flag] if flag == "--config" => Err(ProbeError::Configuration(
            "--config needs a path".into(),
        )),
        positional => ProbeConfig::from_args(positional),
    }
}

fn main() -> ExitCode {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("lockprobe=info,busy_lock=info")),
        )
        .with_thread_names(true)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let probe = match resolve_config(&args).and_then(ContentionProbe::new) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::error!(error = %e, "refusing to start");
            eprintln!("Usage: busy_lock [<inflate monitor> [<hold ms>]] | --config <file.toml>");
            return ExitCode::from(EXIT_CONFIGURATION);
        }
    };

    let config = probe.config();
    tracing::info!(
        inflate = config.inflate_monitor,
        hold_ms = config.hold_ms,
        "starting busy-lock probe"
    );

    let outcome = probe.run(&ParkingInflation::default());
    TracingReporter.report(&outcome);
    println!("{outcome}");

    outcome.exit_code()
}
