//! Run configuration and the process-wide slot used by the CLI

use cub_config::{CompilerConfig, LimitConfig};
use cub_log::Logger;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

/// Execution configuration
#[derive(Clone)]
pub struct RunConfig {
    /// Compile the embedded prelude ahead of every source
    pub use_prelude: bool,
    /// Log the disassembled program at info level after compilation
    pub dump_bytecode: bool,
    pub compiler: CompilerConfig,
    pub limits: LimitConfig,
    pub logger: Arc<Logger>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            use_prelude: true,
            dump_bytecode: false,
            compiler: CompilerConfig::default(),
            limits: LimitConfig::default(),
            logger: Logger::noop(),
        }
    }
}

impl RunConfig {
    pub fn with_logger(mut self, logger: Arc<Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_prelude(mut self, use_prelude: bool) -> Self {
        self.use_prelude = use_prelude;
        self
    }
}

// the logger has no useful Debug form
impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("use_prelude", &self.use_prelude)
            .field("dump_bytecode", &self.dump_bytecode)
            .field("compiler", &self.compiler)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

static GLOBAL_CONFIG: OnceCell<RunConfig> = OnceCell::new();

/// Install the global configuration. Returns `false` if one was already set.
pub fn init(config: RunConfig) -> bool {
    GLOBAL_CONFIG.set(config).is_ok()
}

/// The global configuration, falling back to defaults if `init` never ran
pub fn config() -> &'static RunConfig {
    GLOBAL_CONFIG.get_or_init(RunConfig::default)
}

pub fn is_initialized() -> bool {
    GLOBAL_CONFIG.get().is_some()
}
