//! Prelude functions written in Cub

use cub_core::compiler::ast::Node;
use cub_core::{parse, tokenize};

use crate::CubError;

pub const PRELUDE_SOURCE: &str = include_str!("prelude.cub");

/// Names the prelude defines, in declaration order
pub const PRELUDE_FUNCTIONS: [&str; 5] = ["abs", "min", "max", "clamp", "sign"];

/// Parsed prelude; any failure is a `StdlibFailed`
pub fn prelude_nodes() -> Result<Vec<Node>, CubError> {
    let tokens = tokenize(PRELUDE_SOURCE).map_err(|e| CubError::StdlibFailed(Box::new(e.into())))?;
    parse(tokens).map_err(|e| CubError::StdlibFailed(Box::new(e.into())))
}
