//! Logging setup for the terminal front end.

use std::io::Write;

use chrono::Local;
use log::LevelFilter;

/// Initializes env_logger with a local-time format. `RUST_LOG` overrides
/// the default `info` level.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_module("bluest", LevelFilter::Warn)
        .init();
    log::info!("Logging initialized");
}
