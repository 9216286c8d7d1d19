//! # Local Logger
//!
//! Installs the global `log` backend for a binary.
//!
//! - **Console**: every record goes to stdout with a local timestamp, the
//!   target and a colored level.
//! - **File** (optional): when a log directory is given, records are also
//!   written, uncolored, to `{app_name}-{timestamp}.log` in that directory.
//!   Older log files of the same application are deleted first, keeping the
//!   newest one.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use colored::Colorize;
use glob::glob;
use log::{Level, LevelFilter};
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "[%Y-%m-%d %H:%M:%S]";
const FILE_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Log files kept by rotation, not counting the one about to be created.
const KEEP_LOG_FILES: usize = 1;

/// Crates whose chatter is capped at `Warn`.
const NOISY_TARGETS: &[&str] = &["async_nats", "hyper", "hyper_util", "reqwest", "rustls"];

/// Errors raised while installing the logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    /// The log directory or file could not be created.
    #[error("Log file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The rotation glob pattern is invalid.
    #[error("Invalid log rotation pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    /// The level string is not a known level.
    #[error("Unknown log level '{0}'")]
    Level(String),
    /// A global logger is already installed.
    #[error("Logger already initialized: {0}")]
    Init(#[from] log::SetLoggerError),
}

/// # Logger Options
#[derive(Debug, Clone)]
pub struct LoggerOptions {
    /// Prefix of the log file name.
    pub app_name: String,
    /// Most verbose level that is emitted.
    pub level: LevelFilter,
    /// Directory for the log file. `None` logs to stdout only.
    pub log_dir: Option<PathBuf>,
}

impl LoggerOptions {
    /// Stdout-only logging at `Info`.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            level: LevelFilter::Info,
            log_dir: None,
        }
    }

    /// Sets the level.
    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// Enables the log file in `log_dir`.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(log_dir.into());
        self
    }
}

/// Parses `error`, `warn`, `info`, `debug`, `trace` or `off`, in any case.
pub fn parse_level(level: &str) -> Result<LevelFilter, LoggerError> {
    LevelFilter::from_str(level.trim()).map_err(|_| LoggerError::Level(level.to_string()))
}

fn colored_level(level: Level) -> colored::ColoredString {
    let name = level.to_string();
    match level {
        Level::Error => name.red().bold(),
        Level::Warn => name.yellow(),
        Level::Info => name.green(),
        Level::Debug => name.blue(),
        Level::Trace => name.dimmed(),
    }
}

/// Deletes all but the newest `keep` log files of `app_name` in `log_dir`.
///
/// File names embed a sortable timestamp, so name order is age order.
/// Returns the deleted paths. Files that cannot be deleted are reported on
/// stderr and skipped.
pub fn rotate_logs(app_name: &str, log_dir: &Path, keep: usize) -> Result<Vec<PathBuf>, LoggerError> {
    let pattern = format!("{}/{}-*.log", log_dir.display(), app_name);
    let mut log_files: Vec<PathBuf> = glob(&pattern)?.filter_map(Result::ok).collect();

    // Newest first.
    log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut removed = Vec::new();
    for old_file in log_files.into_iter().skip(keep) {
        match std::fs::remove_file(&old_file) {
            Ok(()) => removed.push(old_file),
            Err(e) => eprintln!("Error deleting old log file {}: {}", old_file.display(), e),
        }
    }
    Ok(removed)
}

fn log_file_path(app_name: &str, log_dir: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format(FILE_STAMP_FORMAT);
    log_dir.join(format!("{}-{}.log", app_name, stamp))
}

/// Builds the dispatch without installing it. Returns the log file path when
/// file logging is enabled.
pub fn build_dispatch(options: &LoggerOptions) -> Result<(fern::Dispatch, Option<PathBuf>), LoggerError> {
    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format(TIMESTAMP_FORMAT),
                record.target(),
                colored_level(record.level()),
                message
            ))
        })
        .chain(std::io::stdout());

    let mut root = fern::Dispatch::new().level(options.level).chain(console);
    for target in NOISY_TARGETS {
        root = root.level_for(*target, options.level.min(LevelFilter::Warn));
    }

    let mut log_path = None;
    if let Some(log_dir) = &options.log_dir {
        std::fs::create_dir_all(log_dir)?;
        rotate_logs(&options.app_name, log_dir, KEEP_LOG_FILES)?;

        let path = log_file_path(&options.app_name, log_dir);
        let file = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{}[{}][{}] {}",
                    chrono::Local::now().format(TIMESTAMP_FORMAT),
                    record.target(),
                    record.level(),
                    message
                ))
            })
            .chain(fern::log_file(&path)?);
        root = root.chain(file);
        log_path = Some(path);
    }

    Ok((root, log_path))
}

/// Installs the global logger. Can succeed only once per process.
pub fn setup_logging(options: &LoggerOptions) -> Result<Option<PathBuf>, LoggerError> {
    let (dispatch, log_path) = build_dispatch(options)?;
    dispatch.apply()?;
    Ok(log_path)
}
