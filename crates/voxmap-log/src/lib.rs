//! Structured logging for voxmap runs.
//!
//! Console output with uptime timestamps and module paths, plus an optional
//! JSON log file for long scans where the console scrolls away. The level is
//! taken from `RUST_LOG` first, then from the config's `debug.log_level`.

use std::path::Path;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use voxmap_config::Config;

/// Filter used when neither `RUST_LOG` nor the config name a level.
const DEFAULT_FILTER: &str = "info,rusty_leveldb=warn";

/// Name of the JSON log file written into `log_dir`.
pub const LOG_FILE_NAME: &str = "voxmap.log";

/// Returns the filter directive string derived from the config.
///
/// The store crate is always capped at `warn`; it logs every compaction
/// at info level, which drowns the scan progress lines.
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.is_empty() => {
            format!("{},rusty_leveldb=warn", config.debug.log_level)
        }
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Creates `log_dir` if needed and opens the JSON log file inside it.
///
/// Returns `None` when either step fails; the run then logs to the console only.
pub fn open_log_file(log_dir: &Path) -> Option<std::fs::File> {
    std::fs::create_dir_all(log_dir).ok()?;
    std::fs::File::create(log_dir.join(LOG_FILE_NAME)).ok()
}

/// Initialize the global tracing subscriber.
///
/// # Arguments
///
/// * `log_dir` - Directory for the JSON log file
/// * `file_logging` - Whether to write the JSON log file at all
/// * `config` - Optional configuration to use for log level override
///
/// # Examples
///
/// ```no_run
/// use voxmap_log::init_logging;
///
/// init_logging(None, false, None);
/// ```
pub fn init_logging(log_dir: Option<&Path>, file_logging: bool, config: Option<&Config>) {
    let filter_str = filter_directive(config);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_names(true) // render threads are named per dimension
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if file_logging
        && let Some(log_dir) = log_dir
        && let Some(log_file) = open_log_file(log_dir)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}
