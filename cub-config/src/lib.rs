//! Cub Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It is the configuration vocabulary shared by every Cub crate.

use serde::{Deserialize, Serialize};

/// Configuration for compiler behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Attach human-readable comments (variable names, member paths) to emitted instructions
    pub emit_comments: bool,
}

/// Configuration for execution limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Maximum evaluation stack size
    pub max_stack_size: usize,
    /// Maximum nesting of function invocations
    pub max_recursion_depth: usize,
    /// Executed instruction indices kept for diagnostics; older ones are dropped
    pub max_trace_len: usize,
}

/// Pipeline phase, used to name log targets and error origins
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Lexer,
    Parser,
    Compiler,
    Vm,
}

impl Phase {
    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
            Phase::Compiler => "compiler",
            Phase::Vm => "vm",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("cub::{}", self.as_str())
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            emit_comments: true,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_stack_size: 4096,
            max_recursion_depth: 256,
            max_trace_len: 1 << 16,
        }
    }
}
