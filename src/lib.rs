//! Cub - a small embeddable scripting language
//!
//! ```text
//! cub-config  configuration data
//! cub-log     explicit, sink-based logging
//! cub-core    lexer, parser, AST, bytecode compiler, VM (no IO)
//! cub-api     Runner: the pipeline, host functions, prelude
//! cub-cli     the `cub` binary
//! ```
//!
//! # Quick Start
//!
//! ```
//! use cub::{Runner, Value};
//!
//! let mut runner = Runner::default();
//! let x = runner.run("function sq(n) returns { return n * n }\nx = sq(4)", "x").unwrap();
//! assert_eq!(x, Value::Number(16.0));
//! ```

pub use cub_api::*;

pub use cub_core as core;
pub use cub_log as log;
