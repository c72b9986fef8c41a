use super::token::SourceRange;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexErrorKind {
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated block comment")]
    UnterminatedComment,
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

/// Tokenization failure with the offending source range
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} at {}..{}", range.start, range.end)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub range: SourceRange,
}

impl LexError {
    pub fn new(kind: LexErrorKind, range: SourceRange) -> Self {
        LexError { kind, range }
    }
}
