#![deny(missing_docs)]
//! Logging for the lesson archiver.
//!
//! Crates log through the `archive_*` macros so they never depend on `log`
//! directly. The binary installs the `simplelog` backend with [`initialize`].

use std::fs::File;
use std::path::{Path, PathBuf};

pub use log;
pub use log::LevelFilter;

use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// `trace` through the re-exported `log` facade. Per-element detail, such as individual removal rule hits.
#[macro_export]
macro_rules! archive_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!($($arg)*);
    }};
}

/// `debug` through the re-exported `log` facade. Per-stage lesson progress.
#[macro_export]
macro_rules! archive_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!($($arg)*);
    }};
}

/// `info` through the re-exported `log` facade. Run milestones and summaries.
#[macro_export]
macro_rules! archive_info {
    ($($arg:tt)*) => {{
        $crate::log::info!($($arg)*);
    }};
}

/// `warn` through the re-exported `log` facade. Per-lesson failures that do not stop the run.
#[macro_export]
macro_rules! archive_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!($($arg)*);
    }};
}

/// `error` through the re-exported `log` facade. Failures that end the run.
#[macro_export]
macro_rules! archive_error {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to the terminal (stderr for warnings and errors, stdout otherwise).
    Terminal,
    /// Write to the given file only.
    File(PathBuf),
    /// Write to both the terminal and the given file.
    Both(PathBuf),
}

/// Install the global logger. Only the first call in a process has effect.
///
/// An uncreatable log file is reported on stderr and left out, so `Both`
/// degrades to terminal output.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::Terminal => vec![terminal_logger(level, config)],
        LogDestination::File(path) => match create_file_logger(&path, level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Both(path) => {
            let mut loggers = vec![terminal_logger(level, config.clone())];
            loggers.extend(create_file_logger(&path, level, config));
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Terminal logger for integration tests. Later calls are no-ops.
pub fn initialize_for_tests() {
    let level = match cfg!(debug_assertions) {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    let _ = CombinedLogger::init(vec![terminal_logger(level, Config::default())]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn create_file_logger(
    path: &Path,
    level: LevelFilter,
    config: Config,
) -> Option<Box<dyn SharedLogger>> {
    match File::create(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file) as Box<dyn SharedLogger>),
        Err(err) => {
            eprintln!("cannot create log file {}: {err}", path.display());
            None
        }
    }
}
