//! Logging for the StatusHub binary.
//!
//! Colored stdout plus `statushub.log` in the config directory. The level
//! comes from `STATUSHUB_LOG` and falls back to a build-dependent default.

use crate::error::StatushubError;

use common::ErrorLocation;

use std::fmt;
use std::io::stdout;
use std::panic::Location;
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use fern::colors::Color::{Blue, Green, Magenta, Red, Yellow};
use fern::colors::ColoredLevelConfig;
use fern::{Dispatch, FormatCallback};
use humantime::format_rfc3339;
use log::{LevelFilter, Record, info, warn};

pub const LOG_LEVEL_ENV: &str = "STATUSHUB_LOG";

pub const LOG_FILE_NAME: &str = "statushub.log";

#[cfg(debug_assertions)]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Debug;

#[cfg(not(debug_assertions))]
pub const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Info;

/// HTTP stack crates that are far chattier than the relay at debug level.
const QUIET_TARGETS: [&str; 4] = ["hyper", "hyper_util", "reqwest", "rustls"];

static LOGGER_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Parse a level name (`off`, `error` .. `trace`, any case).
///
/// Unset or unrecognized values give [`DEFAULT_LOG_LEVEL`].
pub fn level_from(value: Option<&str>) -> LevelFilter {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => LevelFilter::from_str(value).unwrap_or_else(|_| {
            eprintln!("Ignoring {LOG_LEVEL_ENV}={value:?}, using {DEFAULT_LOG_LEVEL}");
            DEFAULT_LOG_LEVEL
        }),
        None => DEFAULT_LOG_LEVEL,
    }
}

pub fn level_from_env() -> LevelFilter {
    level_from(std::env::var(LOG_LEVEL_ENV).ok().as_deref())
}

/// Install the global logger writing to stdout and `log_dir/statushub.log`.
///
/// The first successful call wins; later calls log a warning and return Ok.
/// A failed call can be retried.
///
/// # Errors
///
/// Returns [`StatushubError::Statushub`] if the log file cannot be created or
/// the global logger cannot be installed.
pub fn initialize(log_dir: &Path, level: LevelFilter) -> Result<(), StatushubError> {
    if LOGGER_INSTALLED.swap(true, Ordering::SeqCst) {
        warn!("Logger already initialized");
        return Ok(());
    }

    let installed = dispatch(log_dir, level).and_then(|dispatch| {
        dispatch.apply().map_err(|e| StatushubError::Statushub {
            message: format!("Failed to initialize logger: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    });

    match installed {
        Ok(()) => {
            info!(
                "Logger initialized at {level}, writing {}",
                log_dir.join(LOG_FILE_NAME).display()
            );
            Ok(())
        }
        Err(e) => {
            LOGGER_INSTALLED.store(false, Ordering::SeqCst);
            Err(e)
        }
    }
}

/// Build the stdout and file dispatch without installing it.
///
/// # Errors
///
/// Returns [`StatushubError::Statushub`] if the log file cannot be opened.
#[track_caller]
pub fn dispatch(log_dir: &Path, level: LevelFilter) -> Result<Dispatch, StatushubError> {
    let log_file_path = log_dir.join(LOG_FILE_NAME);
    let log_file = fern::log_file(&log_file_path).map_err(|e| StatushubError::Statushub {
        message: format!("Failed to create log file {}: {e}", log_file_path.display()),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let colors = ColoredLevelConfig::new()
        .debug(Blue)
        .info(Green)
        .warn(Yellow)
        .error(Red)
        .trace(Magenta);

    let stdout_dispatch = Dispatch::new()
        .format(move |out, message, record| {
            write_line(out, message, record, colors.color(record.level()))
        })
        .chain(stdout());

    let file_dispatch = Dispatch::new()
        .format(|out, message, record| write_line(out, message, record, record.level()))
        .chain(log_file);

    let quiet_level = level.min(LevelFilter::Info);
    let base = QUIET_TARGETS
        .iter()
        .fold(Dispatch::new().level(level), |base, target| {
            base.level_for(*target, quiet_level)
        });

    Ok(base.chain(stdout_dispatch).chain(file_dispatch))
}

fn write_line(
    out: FormatCallback<'_>,
    message: &fmt::Arguments<'_>,
    record: &Record<'_>,
    level: impl fmt::Display,
) {
    out.finish(format_args!(
        "[{date} - {level}] {message} [{file}:{line}]",
        date = format_rfc3339(SystemTime::now()),
        file = record.file().unwrap_or("unknown"),
        line = record.line().unwrap_or(0),
    ))
}
