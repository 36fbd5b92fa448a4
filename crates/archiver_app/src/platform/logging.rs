//! Logger setup for the command line tool.

use std::path::PathBuf;

use archive_logging::{LevelFilter, LogDestination};

pub(crate) fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Terminal output always; the log file is added when one is given.
pub(crate) fn initialize(log_file: Option<PathBuf>, verbose: u8) {
    let destination = match log_file {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    archive_logging::initialize(destination, level_for(verbose));
}
