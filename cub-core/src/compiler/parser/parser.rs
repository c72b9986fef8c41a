use super::error::{ParseError, ParseErrorKind, ParseResult};
use super::utils::{binary_operator, get_precedence, shorthand_operator, POWER_PRECEDENCE};
use crate::compiler::ast::{
    Assignment, BinaryOp, BinaryOperator, Body, Call, Conditional, Do, For, Function,
    FunctionPrototype, Node, NodeError, StructPrototype, While,
};
use crate::compiler::lexer::{SourceRange, Token, TokenKind};
use cub_log::{debug, trace, Logger};
use std::sync::Arc;

/// State that depends on where the parser currently is
#[derive(Debug, Clone, Copy, Default)]
struct ParseContext {
    in_function: bool,
    /// `return` takes a value only inside a function declared with `returns`
    current_function_returns: bool,
}

pub struct Parser {
    tokens: Vec<Token>,
    index: usize,
    context: ParseContext,
    logger: Arc<Logger>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_logger(tokens, Logger::noop())
    }

    pub fn with_logger(tokens: Vec<Token>, logger: Arc<Logger>) -> Self {
        let tokens = tokens
            .into_iter()
            .filter(|token| !token.kind.is_comment())
            .collect();

        Parser {
            tokens,
            index: 0,
            context: ParseContext::default(),
            logger,
        }
    }

    /// Parse every remaining token into top-level nodes
    pub fn parse(&mut self) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();
        while self.peek().is_some() {
            let node = self.parse_statement()?;
            trace!(self.logger, "parsed {}", node.description());
            nodes.push(node);
        }
        debug!(self.logger, "parsed {} top-level nodes from {} tokens", nodes.len(), self.tokens.len());
        Ok(nodes)
    }

    // ===== cursor =====

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.index)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    /// Range of the next token, or an empty range at the end of input
    fn current_range(&self) -> SourceRange {
        match self.peek() {
            Some(token) => token.range,
            None => {
                let end = self.tokens.last().map(|t| t.range.end).unwrap_or(0);
                SourceRange::new(end, end)
            }
        }
    }

    fn previous_range(&self) -> SourceRange {
        match self.index.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.range,
            None => self.current_range(),
        }
    }

    fn found_text(&self) -> String {
        match self.peek_kind() {
            Some(kind) => kind.to_string(),
            None => "end of input".to_string(),
        }
    }

    fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.current_range())
    }

    fn expect(&mut self, kind: &TokenKind) -> ParseResult<SourceRange> {
        if self.check(kind) {
            let range = self.current_range();
            self.index += 1;
            Ok(range)
        } else {
            Err(self.error_here(ParseErrorKind::ExpectedCharacterButFound {
                expected: kind.to_string(),
                found: self.found_text(),
            }))
        }
    }

    fn take_identifier(&mut self) -> Option<String> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name)) => {
                let name = name.clone();
                self.index += 1;
                Some(name)
            }
            _ => None,
        }
    }

    fn node_error(error: NodeError, range: SourceRange) -> ParseError {
        let kind = match error {
            NodeError::InvalidAssignmentValue(rejected) => {
                ParseErrorKind::InvalidAssignmentValue { value: rejected.value }
            }
            NodeError::InvalidAssignmentTarget { .. } => ParseErrorKind::ExpectedVariable,
            other @ NodeError::IllegalBinaryOperation { .. } => {
                ParseErrorKind::IllegalBinaryOperation { reason: other.to_string() }
            }
            other @ NodeError::IllegalStatement { .. } => {
                ParseErrorKind::IllegalStatement { reason: other.to_string() }
            }
        };
        ParseError::new(kind, range)
    }

    // ===== statements =====

    fn parse_statement(&mut self) -> ParseResult<Node> {
        if self.should_parse_assignment() {
            self.parse_assignment()
        } else {
            self.parse_expression()
        }
    }

    /// Peek-only scan: `identifier (. identifier)* =` means an assignment follows
    fn should_parse_assignment(&self) -> bool {
        let kind_at = |i: usize| self.tokens.get(i).map(|t| &t.kind);

        if !matches!(kind_at(self.index), Some(TokenKind::Identifier(_))) {
            return false;
        }
        let mut i = self.index + 1;
        loop {
            match kind_at(i) {
                Some(TokenKind::Equals) => return true,
                Some(TokenKind::Dot) if matches!(kind_at(i + 1), Some(TokenKind::Identifier(_))) => {
                    i += 2
                }
                _ => return false,
            }
        }
    }

    fn parse_assignment(&mut self) -> ParseResult<Node> {
        let target_range = self.current_range();
        let Some(name) = self.take_identifier() else {
            return Err(self.error_here(ParseErrorKind::ExpectedVariable));
        };
        let target = self.parse_member_chain(Node::Variable(name))?;
        self.expect(&TokenKind::Equals)?;

        let value_start = self.current_range();
        let value = self.parse_expression()?;
        let value_range = value_start.to(self.previous_range());

        Assignment::new(target, value)
            .map(Node::Assignment)
            .map_err(|e| match e {
                NodeError::InvalidAssignmentTarget { .. } => Self::node_error(e, target_range),
                _ => Self::node_error(e, value_range),
            })
    }

    /// `{ statement* }`
    fn parse_body(&mut self) -> ParseResult<Body> {
        self.expect(&TokenKind::CurlyOpen)?;
        let mut nodes = Vec::new();
        loop {
            match self.peek_kind() {
                Some(TokenKind::CurlyClose) => {
                    self.index += 1;
                    return Ok(Body::new(nodes));
                }
                None => {
                    return Err(self.error_here(ParseErrorKind::ExpectedCharacterButFound {
                        expected: "}".to_string(),
                        found: self.found_text(),
                    }))
                }
                Some(_) => nodes.push(self.parse_statement()?),
            }
        }
    }

    // ===== expressions =====

    fn parse_expression(&mut self) -> ParseResult<Node> {
        let start = self.current_range();
        let lhs = self.parse_primary()?;

        if let Some(op) = self.peek_kind().and_then(shorthand_operator) {
            let op_range = self.current_range();
            self.index += 1;
            if !matches!(lhs, Node::Variable(_) | Node::StructMember { .. }) {
                return Err(ParseError::new(ParseErrorKind::ExpectedVariable, start.to(op_range)));
            }

            // `x op= e` becomes `x = x op e`
            let rhs = self.parse_expression()?;
            let value = BinaryOp::new(op, lhs.clone(), Some(rhs))
                .map_err(|e| Self::node_error(e, op_range))?;
            return Assignment::new(lhs, Node::BinaryOp(value))
                .map(Node::Assignment)
                .map_err(|e| Self::node_error(e, op_range));
        }

        self.parse_binary_op(lhs, 0)
    }

    fn peek_precedence(&self) -> Option<u8> {
        let kind = self.peek_kind()?;
        binary_operator(kind)?;
        get_precedence(kind)
    }

    /// Fold infix operators binding at least as tightly as `min_precedence` onto `lhs`
    fn parse_binary_op(&mut self, mut lhs: Node, min_precedence: u8) -> ParseResult<Node> {
        loop {
            let Some(precedence) = self.peek_precedence() else {
                return Ok(lhs);
            };
            if precedence < min_precedence {
                return Ok(lhs);
            }
            let op_range = self.current_range();
            let Some(op) = self.advance().and_then(|token| binary_operator(&token.kind)) else {
                return Ok(lhs);
            };

            let mut rhs = self.parse_primary()?;
            if let Some(next) = self.peek_precedence() {
                if precedence < next {
                    rhs = self.parse_binary_op(rhs, precedence + 1)?;
                }
            }

            let binary =
                BinaryOp::new(op, lhs, Some(rhs)).map_err(|e| Self::node_error(e, op_range))?;
            lhs = Node::BinaryOp(binary);
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Node> {
        let Some(kind) = self.peek_kind().cloned() else {
            return Err(self.error_here(ParseErrorKind::ExpectedExpression {
                found: self.found_text(),
            }));
        };

        match kind {
            TokenKind::Number(n) => {
                self.index += 1;
                Ok(Node::Number(n))
            }
            TokenKind::Str(s) => {
                self.index += 1;
                Ok(Node::Str(s))
            }
            TokenKind::True | TokenKind::False => {
                self.index += 1;
                Ok(Node::Boolean(kind == TokenKind::True))
            }
            TokenKind::Identifier(_) => self.parse_identifier(),
            TokenKind::ParenOpen => {
                self.index += 1;
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::ParenClose)?;
                Ok(inner)
            }
            TokenKind::Bang => self.parse_not(),
            TokenKind::Minus => self.parse_negation(),
            TokenKind::If => self.parse_conditional(),
            TokenKind::While => self.parse_while(),
            TokenKind::Repeat => self.parse_repeat_while(),
            TokenKind::Do => self.parse_do(),
            TokenKind::For => self.parse_for(),
            TokenKind::Function => self.parse_function(),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => {
                self.index += 1;
                Ok(Node::Break)
            }
            TokenKind::Continue => {
                self.index += 1;
                Ok(Node::Continue)
            }
            _ => Err(self.error_here(ParseErrorKind::ExpectedExpression {
                found: self.found_text(),
            })),
        }
    }

    /// Variable, member chain, or call
    fn parse_identifier(&mut self) -> ParseResult<Node> {
        let Some(name) = self.take_identifier() else {
            return Err(self.error_here(ParseErrorKind::UnexpectedToken {
                found: self.found_text(),
            }));
        };

        if self.check(&TokenKind::ParenOpen) {
            self.index += 1;
            let arguments = self.parse_call_arguments()?;
            return Ok(Node::Call(Call {
                callee: name,
                arguments,
            }));
        }

        self.parse_member_chain(Node::Variable(name))
    }

    fn parse_call_arguments(&mut self) -> ParseResult<Vec<Node>> {
        let mut arguments = Vec::new();
        if self.check(&TokenKind::ParenClose) {
            self.index += 1;
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            match self.peek_kind() {
                Some(TokenKind::Comma) => self.index += 1,
                Some(TokenKind::ParenClose) => {
                    self.index += 1;
                    return Ok(arguments);
                }
                _ => {
                    return Err(self.error_here(ParseErrorKind::ExpectedCharacterButFound {
                        expected: ")".to_string(),
                        found: self.found_text(),
                    }))
                }
            }
        }
    }

    /// `root.a.b` as `StructMember(StructMember(root, a), b)`
    fn parse_member_chain(&mut self, root: Node) -> ParseResult<Node> {
        let mut names = Vec::new();
        while self.check(&TokenKind::Dot) {
            self.index += 1;
            match self.take_identifier() {
                Some(name) => names.push(name),
                None => {
                    return Err(self.error_here(ParseErrorKind::UnexpectedToken {
                        found: self.found_text(),
                    }))
                }
            }
        }

        Ok(names
            .into_iter()
            .fold(root, |variable, name| Node::StructMember {
                variable: Box::new(variable),
                name,
            }))
    }

    fn parse_not(&mut self) -> ParseResult<Node> {
        let bang_range = self.current_range();
        self.index += 1;

        let operand = match self.peek_kind() {
            Some(TokenKind::ParenOpen) => {
                self.index += 1;
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::ParenClose)?;
                inner
            }
            Some(TokenKind::Identifier(_)) => self.parse_identifier()?,
            Some(TokenKind::Number(n)) => {
                let n = *n;
                self.index += 1;
                Node::Number(n)
            }
            Some(TokenKind::True) | Some(TokenKind::False) => {
                let value = self.check(&TokenKind::True);
                self.index += 1;
                Node::Boolean(value)
            }
            Some(TokenKind::Bang) => self.parse_not()?,
            _ => {
                return Err(self.error_here(ParseErrorKind::ExpectedExpression {
                    found: self.found_text(),
                }))
            }
        };

        BinaryOp::new(BinaryOperator::Not, operand, None)
            .map(Node::BinaryOp)
            .map_err(|e| Self::node_error(e, bang_range))
    }

    /// `-3` is a literal; `-x` is `0 - x`. `^` binds first, so `-2 ^ 2` is `-(2 ^ 2)`.
    fn parse_negation(&mut self) -> ParseResult<Node> {
        let minus_range = self.current_range();
        self.index += 1;

        let operand = self.parse_primary()?;
        match self.parse_binary_op(operand, POWER_PRECEDENCE)? {
            Node::Number(n) => Ok(Node::Number(-n)),
            operand => BinaryOp::new(BinaryOperator::Sub, Node::Number(0.0), Some(operand))
                .map(Node::BinaryOp)
                .map_err(|e| Self::node_error(e, minus_range)),
        }
    }

    fn parse_conditional(&mut self) -> ParseResult<Node> {
        let keyword = self.current_range();
        self.index += 1;

        let condition = self.parse_expression()?;
        let body = self.parse_body()?;

        let else_body = if self.check(&TokenKind::Else) {
            self.index += 1;
            if self.check(&TokenKind::If) {
                Some(Body::new(vec![self.parse_conditional()?]))
            } else {
                Some(self.parse_body()?)
            }
        } else {
            None
        };

        Conditional::new(condition, body, else_body)
            .map(Node::Conditional)
            .map_err(|e| Self::node_error(e, keyword))
    }

    fn parse_while(&mut self) -> ParseResult<Node> {
        let keyword = self.current_range();
        self.index += 1;

        let condition = self.parse_expression()?;
        let body = self.parse_body()?;

        While::new(condition, body)
            .map(Node::While)
            .map_err(|e| Self::node_error(e, keyword))
    }

    fn parse_repeat_while(&mut self) -> ParseResult<Node> {
        let keyword = self.current_range();
        self.index += 1;

        let body = self.parse_body()?;
        self.expect(&TokenKind::While)?;
        let condition = self.parse_expression()?;

        While::new(condition, body)
            .map(Node::RepeatWhile)
            .map_err(|e| Self::node_error(e, keyword))
    }

    fn parse_do(&mut self) -> ParseResult<Node> {
        let keyword = self.current_range();
        self.index += 1;

        let amount = self.parse_expression()?;
        self.expect(&TokenKind::Times)?;
        let body = self.parse_body()?;

        Do::new(amount, body)
            .map(Node::Do)
            .map_err(|e| Self::node_error(e, keyword))
    }

    /// `for i = 0, i < n, i += 1 { ... }`
    fn parse_for(&mut self) -> ParseResult<Node> {
        let keyword = self.current_range();
        self.index += 1;

        let assignment = self.parse_statement()?;
        self.expect(&TokenKind::Comma)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Comma)?;
        let interval = self.parse_statement()?;
        let body = self.parse_body()?;

        For::new(assignment, condition, interval, body)
            .map(Node::For)
            .map_err(|e| Self::node_error(e, keyword))
    }

    fn parse_function(&mut self) -> ParseResult<Node> {
        if self.context.in_function {
            return Err(self.error_here(ParseErrorKind::IllegalStatement {
                reason: "functions cannot be declared inside a function".to_string(),
            }));
        }
        self.index += 1;

        let Some(name) = self.take_identifier() else {
            return Err(self.error_here(ParseErrorKind::ExpectedFunctionName {
                found: self.found_text(),
            }));
        };
        let argument_names = self.parse_name_list(
            TokenKind::ParenOpen,
            TokenKind::ParenClose,
            ParseErrorKind::ExpectedArgumentList,
        )?;

        let returns = self.check(&TokenKind::Returns);
        if returns {
            self.index += 1;
        }

        let saved = self.context;
        self.context = ParseContext {
            in_function: true,
            current_function_returns: returns,
        };
        let body = self.parse_body();
        self.context = saved;

        let prototype = FunctionPrototype {
            name,
            argument_names,
            returns,
        };
        Ok(Node::Function(Function::new(prototype, body?)))
    }

    fn parse_struct(&mut self) -> ParseResult<Node> {
        self.index += 1;

        let Some(name) = self.take_identifier() else {
            return Err(self.error_here(ParseErrorKind::ExpectedFunctionName {
                found: self.found_text(),
            }));
        };
        let members = self.parse_name_list(
            TokenKind::CurlyOpen,
            TokenKind::CurlyClose,
            ParseErrorKind::ExpectedMemberList,
        )?;

        Ok(Node::StructPrototype(StructPrototype { name, members }))
    }

    /// `open name (, name)* close`, possibly empty
    fn parse_name_list(
        &mut self,
        open: TokenKind,
        close: TokenKind,
        error: ParseErrorKind,
    ) -> ParseResult<Vec<String>> {
        if !self.check(&open) {
            return Err(self.error_here(error.clone()));
        }
        self.index += 1;

        let mut names = Vec::new();
        if self.check(&close) {
            self.index += 1;
            return Ok(names);
        }
        loop {
            let Some(name) = self.take_identifier() else {
                return Err(self.error_here(error.clone()));
            };
            names.push(name);

            if self.check(&TokenKind::Comma) {
                self.index += 1;
            } else if self.check(&close) {
                self.index += 1;
                return Ok(names);
            } else {
                return Err(self.error_here(error.clone()));
            }
        }
    }

    fn parse_return(&mut self) -> ParseResult<Node> {
        self.index += 1;
        if self.context.current_function_returns {
            let value = self.parse_expression()?;
            Ok(Node::Return(Some(Box::new(value))))
        } else {
            Ok(Node::Return(None))
        }
    }
}
