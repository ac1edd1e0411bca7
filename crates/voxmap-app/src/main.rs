//! Command-line entry point: renders a world directory to images and exports.
//!
//! Run with: `cargo run -p voxmap-app -- --db <world>`

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use voxmap_config::{CliArgs, Config};
use voxmap_world::WorldSession;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config_dir = args.config_dir();

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    voxmap_log::init_logging(Some(&log_dir), config.debug.file_logging, Some(&config));

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        return ExitCode::FAILURE;
    }

    info!(
        world = %config.world.path.display(),
        out = %config.output.dir.display(),
        "voxmap {}",
        env!("CARGO_PKG_VERSION")
    );
    match WorldSession::run(config) {
        Ok(report) => {
            info!(files = report.files.len(), "Done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
