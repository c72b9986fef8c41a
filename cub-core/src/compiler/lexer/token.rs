use std::fmt;

/// Byte range into the source text, end exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceRange {
    pub start: usize,
    pub end: usize,
}

impl SourceRange {
    pub fn new(start: usize, end: usize) -> Self {
        SourceRange { start, end }
    }

    /// Smallest range covering both
    pub fn to(self, other: SourceRange) -> SourceRange {
        SourceRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// 1-based line and column of `start`, counting columns in chars
    pub fn line_column(&self, source: &str) -> (usize, usize) {
        let start = self.start.min(source.len());
        let before = source.get(..start).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        (line, column)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Identifier(String),
    Comment(String),

    // keywords
    True,
    False,
    If,
    Else,
    While,
    Repeat,
    For,
    Do,
    Times,
    Function,
    Returns,
    Return,
    Struct,
    Break,
    Continue,

    // punctuation
    ParenOpen,
    ParenClose,
    CurlyOpen,
    CurlyClose,
    Comma,
    Dot,
    Equals,

    // arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Caret,

    // comparison
    DoubleEquals,
    NotEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,

    // boolean
    AndAnd,
    OrOr,
    Bang,

    // shorthand assignment
    PlusEquals,
    MinusEquals,
    StarEquals,
    SlashEquals,
    CaretEquals,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "repeat" => TokenKind::Repeat,
            "for" => TokenKind::For,
            "do" => TokenKind::Do,
            "times" => TokenKind::Times,
            "function" => TokenKind::Function,
            "returns" => TokenKind::Returns,
            "return" => TokenKind::Return,
            "struct" => TokenKind::Struct,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::Comment(_))
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Number(n) => return write!(f, "{n}"),
            TokenKind::Str(s) => return write!(f, "\"{s}\""),
            TokenKind::Identifier(name) => return write!(f, "{name}"),
            TokenKind::Comment(_) => "comment",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::Repeat => "repeat",
            TokenKind::For => "for",
            TokenKind::Do => "do",
            TokenKind::Times => "times",
            TokenKind::Function => "function",
            TokenKind::Returns => "returns",
            TokenKind::Return => "return",
            TokenKind::Struct => "struct",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::ParenOpen => "(",
            TokenKind::ParenClose => ")",
            TokenKind::CurlyOpen => "{",
            TokenKind::CurlyClose => "}",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Equals => "=",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Caret => "^",
            TokenKind::DoubleEquals => "==",
            TokenKind::NotEquals => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEquals => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEquals => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Bang => "!",
            TokenKind::PlusEquals => "+=",
            TokenKind::MinusEquals => "-=",
            TokenKind::StarEquals => "*=",
            TokenKind::SlashEquals => "/=",
            TokenKind::CaretEquals => "^=",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: SourceRange,
}

impl Token {
    pub fn new(kind: TokenKind, range: SourceRange) -> Self {
        Token { kind, range }
    }
}
