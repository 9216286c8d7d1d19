use anyhow::{Context, Result};
use stream_common::loggers::{parse_level, setup_logging, LoggerOptions};

use super::config::CommonArgs;

pub fn init(app_name: &str, args: &CommonArgs) -> Result<()> {
    let level = parse_level(&args.log_level)?;

    let mut options = LoggerOptions::new(app_name).with_level(level);
    if let Some(dir) = &args.log_dir {
        options = options.with_log_dir(dir);
    }

    let log_path = setup_logging(&options).context("Failed to initialize logging")?;
    if let Some(path) = log_path {
        log::debug!("Logging to {}", path.display());
    }
    Ok(())
}
