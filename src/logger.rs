//! Logging setup.
//!
//! Console logging is controlled through the `RUST_LOG` environment
//! variable (`error`, `warn`, `info`, `debug`, `trace`), defaulting to
//! `info`. Output goes to stdout so container runtimes collect it.

use std::io::Write;

use log::LevelFilter;

/// Initialize the logging system. Safe to call more than once; later calls
/// are ignored.
pub fn init_logger() {
    let default_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(default_level)
        .target(env_logger::Target::Stdout)
        .try_init()
        .ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_is_idempotent() {
        init_logger();
        init_logger();
    }
}
