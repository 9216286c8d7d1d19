/// Implements the process logger: `fern` dispatch to stdout and an optional
/// rotated log file.
pub mod loggerlocal;

#[cfg(test)]
pub(crate) mod capture;

pub use loggerlocal::{
    build_dispatch, parse_level, rotate_logs, setup_logging, LoggerError, LoggerOptions,
};
