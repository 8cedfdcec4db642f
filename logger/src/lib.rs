use std::{fs, path::Path};

use colored::Colorize;
use common::env_config::Config;
use middleware::logger::LoggerMiddleware;

pub mod middleware {
    pub mod logger;
}

/// Target of the per-request lines, kept out of the events file.
pub const REQUEST_TARGET: &str = "http";

/// Installs the global logger.
///
/// The console gets everything at `DEBUG` and above when enabled. The events
/// file only gets `INFO` ledger events and the errors file only `ERROR`.
pub fn setup(config: &Config) -> Result<(), fern::InitError> {
    let events = open_log(&config.event_log_path)?;
    let errors = open_log(&config.error_log_path)?;

    let mut dispatch = fern::Dispatch::new()
        .level(log::LevelFilter::Debug)
        .level_for("sqlx", log::LevelFilter::Warn)
        .level_for("actix_server", log::LevelFilter::Info)
        .chain(
            fern::Dispatch::new()
                .filter(|meta| meta.level() == log::Level::Info && meta.target() != REQUEST_TARGET)
                .format(plain_format)
                .chain(events),
        )
        .chain(
            fern::Dispatch::new()
                .filter(|meta| meta.level() == log::Level::Error)
                .format(plain_format)
                .chain(errors),
        );

    if config.console_logging_enabled {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(|out, message, record| {
                    let color = match record.level() {
                        log::Level::Info => "green",
                        log::Level::Warn => "yellow",
                        log::Level::Error => "red",
                        log::Level::Debug => "magenta",
                        log::Level::Trace => "bright black",
                    };
                    out.finish(format_args!(
                        "{}[{}][{}] {}",
                        chrono::Local::now().format("[%H:%M:%S]"),
                        record.target(),
                        record.level().to_string().color(color),
                        message
                    ))
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch.apply()?;
    Ok(())
}

fn plain_format(out: fern::FormatCallback, message: &std::fmt::Arguments, record: &log::Record) {
    out.finish(format_args!(
        "{} {} {}",
        chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
        record.level(),
        message
    ))
}

fn open_log(path: &str) -> Result<fs::File, fern::InitError> {
    if let Some(dir) = Path::new(path).parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(fern::log_file(path)?)
}

pub fn middleware() -> LoggerMiddleware {
    LoggerMiddleware::new()
}
