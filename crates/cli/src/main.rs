use std::io;
use std::process::ExitCode;

use finmate_core::config::{AppConfig, LoadOptions, LogFormat};
use tracing::Level;

fn init_logging() {
    // A broken config is reported by the command itself; logging falls back to defaults.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);

    let builder =
        tracing_subscriber::fmt().with_target(false).with_max_level(log_level).with_writer(io::stderr);
    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    init_logging();
    finmate_cli::run()
}
