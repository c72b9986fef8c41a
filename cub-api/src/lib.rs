//! Cub API - execution orchestration
//!
//! - [`Runner`]: lexer → parser → compiler → VM, host functions, prelude
//! - [`RunConfig`]: explicit configuration, plus a global slot for the CLI
//! - [`CubError`]: one error type for every stage
//!
//! ```
//! use cub_api::{Runner, RunConfig, Value};
//!
//! let mut runner = Runner::new(RunConfig::default());
//! assert_eq!(runner.run("x = max(2, 5) * 2", "x"), Ok(Value::Number(10.0)));
//! ```

pub mod config;
pub mod error;
pub mod prelude;
pub mod runner;
pub mod types;

pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};
pub use error::CubError;
pub use prelude::{PRELUDE_FUNCTIONS, PRELUDE_SOURCE};
pub use runner::Runner;
pub use types::{describe_value, CompileOutput};

pub use cub_config::{CompilerConfig, LimitConfig, Phase};
pub use cub_core::{Completion, ExternalArguments, ExternalReply, Value, Vm, VmState};

/// Run `source` with the global configuration and read variable `name`
pub fn quick_run(source: &str, name: &str) -> Result<Value, CubError> {
    Runner::new(get_config().clone()).run(source, name)
}
