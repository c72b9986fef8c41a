//! Cub lexer
//!
//! Turns source text into a flat token vector. Comments are kept as
//! `Comment` tokens so tools can show them; the parser drops them.

mod error;
mod scanner;
mod token;

pub use error::{LexError, LexErrorKind};
pub use scanner::Lexer;
pub use token::{SourceRange, Token, TokenKind};

/// Tokenize `source` without logging
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).tokenize()
}
