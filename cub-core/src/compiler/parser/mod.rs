//! Recursive-descent parser with precedence climbing for binary operators

mod error;
#[allow(clippy::module_inception)]
mod parser;
mod utils;

pub use error::{ParseError, ParseErrorKind, ParseResult};
pub use parser::Parser;
pub use utils::{binary_operator, get_precedence, shorthand_operator};

use super::ast::Node;
use super::lexer::Token;

/// Parse a token vector (comments allowed) into top-level nodes
pub fn parse(tokens: Vec<Token>) -> ParseResult<Vec<Node>> {
    Parser::new(tokens).parse()
}
