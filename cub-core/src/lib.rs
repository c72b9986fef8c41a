//! Cub Core - lexer, parser, bytecode compiler and virtual machine (pure logic, no IO)
//!
//! Everything here works on in-memory data. Configuration and loggers are
//! passed in explicitly; nothing reads global state.

pub mod compiler;
pub mod runtime;

pub use compiler::ast::{Body, Node, NodeError};
pub use compiler::lexer::{tokenize, LexError, Lexer, SourceRange, Token, TokenKind};
pub use compiler::parser::{parse, ParseError, ParseErrorKind, Parser};
pub use runtime::bytecode::{Instruction, Label, Opcode, Operand};
pub use runtime::compiler::{CompileError, Compiler, FunctionSignature};
pub use runtime::value::Value;
pub use runtime::vm::{
    Completion, Counter, CounterError, ExternalArguments, ExternalFunction, ExternalReply, Vm,
    VmError, VmState,
};

pub use cub_config::{CompilerConfig, LimitConfig, Phase};
