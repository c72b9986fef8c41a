use super::error::{LexError, LexErrorKind};
use super::token::{SourceRange, Token, TokenKind};
use cub_log::{debug, trace, Logger};
use std::iter::Peekable;
use std::str::CharIndices;
use std::sync::Arc;

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    logger: Arc<Logger>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_logger(source, Logger::noop())
    }

    pub fn with_logger(source: &'a str, logger: Arc<Logger>) -> Self {
        Lexer {
            source,
            chars: source.char_indices().peekable(),
            logger,
        }
    }

    /// Scan the whole source
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            trace!(self.logger, "token {:?} at {}..{}", token.kind, token.range.start, token.range.end);
            tokens.push(token);
        }
        debug!(self.logger, "lexed {} tokens from {} bytes", tokens.len(), self.source.len());
        Ok(tokens)
    }

    fn offset(&mut self) -> usize {
        self.chars.peek().map(|&(i, _)| i).unwrap_or(self.source.len())
    }

    fn bump_if(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_whitespace()) {
            self.chars.next();
        }

        let Some((start, c)) = self.chars.next() else {
            return Ok(None);
        };

        let kind = match c {
            '(' => TokenKind::ParenOpen,
            ')' => TokenKind::ParenClose,
            '{' => TokenKind::CurlyOpen,
            '}' => TokenKind::CurlyClose,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            '=' => self.either('=', TokenKind::DoubleEquals, TokenKind::Equals),
            '+' => self.either('=', TokenKind::PlusEquals, TokenKind::Plus),
            '-' => self.either('=', TokenKind::MinusEquals, TokenKind::Minus),
            '*' => self.either('=', TokenKind::StarEquals, TokenKind::Star),
            '^' => self.either('=', TokenKind::CaretEquals, TokenKind::Caret),
            '<' => self.either('=', TokenKind::LessEquals, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEquals, TokenKind::Greater),
            '!' => self.either('=', TokenKind::NotEquals, TokenKind::Bang),
            '/' => {
                if self.bump_if('/') {
                    self.line_comment()
                } else if self.bump_if('*') {
                    self.block_comment(start)?
                } else {
                    self.either('=', TokenKind::SlashEquals, TokenKind::Slash)
                }
            }
            '&' if self.bump_if('&') => TokenKind::AndAnd,
            '|' if self.bump_if('|') => TokenKind::OrOr,
            '"' => self.string(start)?,
            c if c.is_ascii_digit() => self.number(start)?,
            c if c.is_alphabetic() || c == '_' => self.word(start),
            other => {
                return Err(LexError::new(
                    LexErrorKind::InvalidCharacter(other),
                    SourceRange::new(start, start + other.len_utf8()),
                ))
            }
        };

        let end = self.offset();
        Ok(Some(Token::new(kind, SourceRange::new(start, end))))
    }

    fn either(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.bump_if(next) {
            matched
        } else {
            single
        }
    }

    fn line_comment(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            text.push(c);
            self.chars.next();
        }
        TokenKind::Comment(text.trim().to_string())
    }

    fn block_comment(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '*')) if self.bump_if('/') => {
                    return Ok(TokenKind::Comment(text.trim().to_string()))
                }
                Some((_, c)) => text.push(c),
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedComment,
                        SourceRange::new(start, self.source.len()),
                    ))
                }
            }
        }
    }

    fn string(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(TokenKind::Str(text)),
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => text.push('\n'),
                    Some((_, 't')) => text.push('\t'),
                    Some((_, '"')) => text.push('"'),
                    Some((_, '\\')) => text.push('\\'),
                    // unknown escapes are kept verbatim
                    Some((_, other)) => {
                        text.push('\\');
                        text.push(other);
                    }
                    None => break,
                },
                Some((_, c)) => text.push(c),
                None => break,
            }
        }
        Err(LexError::new(
            LexErrorKind::UnterminatedString,
            SourceRange::new(start, self.source.len()),
        ))
    }

    fn number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
            self.chars.next();
        }
        // a fractional part needs a digit after the dot, `1.x` stays member-access shaped
        let mut ahead = self.chars.clone();
        if matches!(ahead.next(), Some((_, '.')))
            && matches!(ahead.next(), Some((_, c)) if c.is_ascii_digit())
        {
            self.chars.next();
            while matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                self.chars.next();
            }
        }

        let end = self.offset();
        let text = &self.source[start..end];
        text.parse::<f64>().map(TokenKind::Number).map_err(|_| {
            LexError::new(
                LexErrorKind::InvalidNumber(text.to_string()),
                SourceRange::new(start, end),
            )
        })
    }

    fn word(&mut self, start: usize) -> TokenKind {
        while matches!(self.chars.peek(), Some(&(_, c)) if c.is_alphanumeric() || c == '_') {
            self.chars.next();
        }
        let text = &self.source[start..self.offset()];
        TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()))
    }
}
