use crate::compiler::ast::BinaryOperator;
use crate::compiler::lexer::TokenKind;

/// `^`, the tightest infix operator. Prefix `-` binds just below it.
pub const POWER_PRECEDENCE: u8 = 60;

/// Binding strength of an operator token; higher binds tighter. `None` for non-operators.
pub fn get_precedence(kind: &TokenKind) -> Option<u8> {
    let precedence = match kind {
        TokenKind::Bang => 80,
        TokenKind::Caret => POWER_PRECEDENCE,
        TokenKind::Star | TokenKind::Slash => 40,
        TokenKind::Plus | TokenKind::Minus => 20,
        TokenKind::DoubleEquals
        | TokenKind::NotEquals
        | TokenKind::Less
        | TokenKind::LessEquals
        | TokenKind::Greater
        | TokenKind::GreaterEquals => 10,
        TokenKind::AndAnd => 4,
        TokenKind::OrOr => 2,
        _ => return None,
    };
    Some(precedence)
}

/// Infix operator for a token (`!` is prefix only and has no infix form)
pub fn binary_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::Caret => BinaryOperator::Pow,
        TokenKind::AndAnd => BinaryOperator::And,
        TokenKind::OrOr => BinaryOperator::Or,
        TokenKind::DoubleEquals => BinaryOperator::Eq,
        TokenKind::NotEquals => BinaryOperator::Neq,
        TokenKind::Less => BinaryOperator::Lt,
        TokenKind::LessEquals => BinaryOperator::Le,
        TokenKind::Greater => BinaryOperator::Gt,
        TokenKind::GreaterEquals => BinaryOperator::Ge,
        _ => return None,
    };
    Some(op)
}

/// Operator a shorthand assignment (`+=` and friends) expands to
pub fn shorthand_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::PlusEquals => BinaryOperator::Add,
        TokenKind::MinusEquals => BinaryOperator::Sub,
        TokenKind::StarEquals => BinaryOperator::Mul,
        TokenKind::SlashEquals => BinaryOperator::Div,
        TokenKind::CaretEquals => BinaryOperator::Pow,
        _ => return None,
    };
    Some(op)
}
