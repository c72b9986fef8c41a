//! Logger setup for the CLI: stderr, plus an optional file

use crate::config::Cli;
use cub_log::{LogConfig, Logger};
use std::sync::Arc;

pub fn build_logger(cli: &Cli) -> Result<Arc<Logger>, cub_log::Error> {
    let mut config = LogConfig::new(cli.log_level).with_stderr();
    if let Some(path) = &cli.log_file {
        config = config.with_file(path.to_string_lossy());
    }
    let (logger, _) = config.try_init()?;
    Ok(logger)
}
