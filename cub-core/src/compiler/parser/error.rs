use crate::compiler::lexer::SourceRange;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("unexpected token '{found}'")]
    UnexpectedToken { found: String },
    #[error("expected '{expected}' but found '{found}'")]
    ExpectedCharacterButFound { expected: String, found: String },
    #[error("expected an expression, found '{found}'")]
    ExpectedExpression { found: String },
    #[error("expected a function name, found '{found}'")]
    ExpectedFunctionName { found: String },
    #[error("expected an argument list")]
    ExpectedArgumentList,
    #[error("expected a member list")]
    ExpectedMemberList,
    #[error("expected a variable before the shorthand operator")]
    ExpectedVariable,
    #[error("{value} cannot be assigned")]
    InvalidAssignmentValue { value: String },
    #[error("illegal binary operation: {reason}")]
    IllegalBinaryOperation { reason: String },
    #[error("illegal statement: {reason}")]
    IllegalStatement { reason: String },
}

/// Parse failure; parsing stops at the first one
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at {}..{}", range.start, range.end)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub range: SourceRange,
}

pub type ParseResult<T> = Result<T, ParseError>;

impl ParseError {
    pub fn new(kind: ParseErrorKind, range: SourceRange) -> Self {
        ParseError { kind, range }
    }

    /// 1-based (line, column) of the error start in `source`
    pub fn position_in(&self, source: &str) -> (usize, usize) {
        self.range.line_column(source)
    }

    /// Render the error against the source it came from:
    ///
    /// ```text
    /// line 1, column 5: expected an expression, found '}'
    /// x = }
    ///     ^
    /// ```
    pub fn describe_in(&self, source: &str) -> String {
        let (line, column) = self.position_in(source);
        let line_text = source.lines().nth(line - 1).unwrap_or("");

        let line_chars = line_text.chars().count();
        let span_chars = source
            .get(self.range.start..self.range.end.min(source.len()))
            .map(|s| s.chars().take_while(|&c| c != '\n').count())
            .unwrap_or(0);
        let width = span_chars.clamp(1, line_chars.saturating_sub(column - 1).max(1));

        format!(
            "line {line}, column {column}: {}\n{line_text}\n{}{}",
            self.kind,
            " ".repeat(column - 1),
            "^".repeat(width)
        )
    }
}
