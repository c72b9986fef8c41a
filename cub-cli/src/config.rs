//! Command line options and their mapping onto `RunConfig`

use clap::Parser;
use cub_api::RunConfig;
use cub_log::Level;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "cub", about = "Run Cub scripts", version)]
pub struct Cli {
    /// Script to run
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print this top-level variable after the run (repeatable)
    #[arg(long = "get", value_name = "NAME")]
    pub get: Vec<String>,

    /// Do not compile the prelude (abs, min, max, clamp, sign)
    #[arg(long)]
    pub no_prelude: bool,

    /// Print the token stream
    #[arg(long)]
    pub tokens: bool,

    /// Print the syntax tree
    #[arg(long)]
    pub ast: bool,

    /// Print the compiled program as JSON
    #[arg(long)]
    pub bytecode: bool,

    /// silent, error, warn, info, debug or trace
    #[arg(long, value_name = "LEVEL", default_value = "warn", value_parser = parse_level)]
    pub log_level: Level,

    /// Also append log records to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

fn parse_level(s: &str) -> Result<Level, String> {
    s.parse::<Level>().map_err(|e| e.to_string())
}

impl Cli {
    pub fn run_config(&self, logger: Arc<cub_log::Logger>) -> RunConfig {
        RunConfig::default()
            .with_prelude(!self.no_prelude)
            .with_logger(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "cub", "script.cub", "--get", "x", "--get", "y", "--no-prelude", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.file, PathBuf::from("script.cub"));
        assert_eq!(cli.get, vec!["x", "y"]);
        assert!(cli.no_prelude);
        assert!(!cli.bytecode);
        assert_eq!(cli.log_level, Level::Debug);
        assert!(!cli.run_config(cub_log::Logger::noop()).use_prelude);
    }

    #[test]
    fn test_defaults_and_bad_level() {
        let cli = Cli::try_parse_from(["cub", "a.cub"]).unwrap();
        assert_eq!(cli.log_level, Level::Warn);
        assert!(cli.run_config(cub_log::Logger::noop()).use_prelude);
        assert!(Cli::try_parse_from(["cub", "a.cub", "--log-level", "loud"]).is_err());
    }
}
