//! Unified error type for the whole pipeline

use cub_config::Phase;
use cub_core::{CompileError, LexError, ParseError, VmError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CubError {
    #[error("{0}")]
    Lex(#[from] LexError),

    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("Compiler error: {0}")]
    Compile(#[from] CompileError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] VmError),

    /// The requested variable was never assigned at top level
    #[error("variable '{name}' has no value")]
    RegisterNotFound { name: String },

    #[error("prelude failed: {0}")]
    StdlibFailed(Box<CubError>),

    #[error("run failed: {reason}")]
    RunFailed { reason: String },

    /// The run is parked on a deferred external call
    #[error("run suspended waiting for an external function")]
    Suspended,
}

impl CubError {
    /// Stage that produced the error
    pub fn phase(&self) -> Phase {
        match self {
            CubError::Lex(_) => Phase::Lexer,
            CubError::Parse(_) => Phase::Parser,
            CubError::Compile(_) => Phase::Compiler,
            CubError::StdlibFailed(inner) => inner.phase(),
            CubError::Runtime(_)
            | CubError::RegisterNotFound { .. }
            | CubError::RunFailed { .. }
            | CubError::Suspended => Phase::Vm,
        }
    }

    /// 1-based line and column in `source`, for errors that carry a range
    pub fn position_in(&self, source: &str) -> Option<(usize, usize)> {
        match self {
            CubError::Lex(e) => Some(e.range.line_column(source)),
            CubError::Parse(e) => Some(e.position_in(source)),
            _ => None,
        }
    }

    /// Message with source context where the error has a location
    pub fn report(&self, source: &str) -> String {
        match self {
            CubError::Parse(e) => format!("{} error at {}", self.phase().as_str(), e.describe_in(source)),
            CubError::Lex(e) => {
                let (line, column) = e.range.line_column(source);
                let line_text = source.lines().nth(line - 1).unwrap_or("");
                format!(
                    "lexer error at line {line}, column {column}: {}\n{line_text}\n{}^",
                    e.kind,
                    " ".repeat(column - 1)
                )
            }
            other => format!("{} error: {}", other.phase().as_str(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cub_core::{parse, tokenize};

    #[test]
    fn test_phase() {
        let lex = tokenize("x = @").unwrap_err();
        assert_eq!(CubError::from(lex).phase(), Phase::Lexer);
        assert_eq!(CubError::Suspended.phase(), Phase::Vm);
        assert_eq!(
            CubError::StdlibFailed(Box::new(CubError::from(CompileError::BreakOutsideLoop))).phase(),
            Phase::Compiler
        );
    }

    #[test]
    fn test_report_lex_error() {
        let source = "x = 1\ny = #";
        let err = CubError::from(tokenize(source).unwrap_err());
        assert_eq!(err.position_in(source), Some((2, 5)));
        let report = err.report(source);
        assert!(report.starts_with("lexer error at line 2, column 5"), "{report}");
        assert!(report.ends_with("y = #\n    ^"), "{report}");
    }

    #[test]
    fn test_report_parse_error() {
        let source = "x = }";
        let err = CubError::from(parse(tokenize(source).unwrap()).unwrap_err());
        let report = err.report(source);
        assert!(report.starts_with("parser error at line 1, column 5"), "{report}");
        assert!(report.contains("\nx = }\n    ^"), "{report}");
    }

    #[test]
    fn test_report_without_location() {
        let err = CubError::RegisterNotFound { name: "y".into() };
        assert_eq!(err.position_in("y"), None);
        assert_eq!(err.report("y"), "vm error: variable 'y' has no value");
    }
}
