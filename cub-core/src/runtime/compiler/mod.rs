//! AST → bytecode compiler
//!
//! A single forward pass. Every emitted instruction takes the next label from
//! the counter, so labels are strictly increasing in program order. Control
//! constructs reserve the label of their leading jump, lower their body, and
//! then build the jump once the target is known.

pub mod context;
pub mod error;
mod expr;
mod stmt;
pub mod var;

pub use context::{FunctionSignature, FunctionTable, LoopContext, MemberTable};
pub use error::CompileError;
pub use var::Scope;

use crate::compiler::ast::Node;
use crate::runtime::bytecode::{Instruction, Label, Opcode};
use cub_config::CompilerConfig;
use cub_log::{debug, Logger};
use std::sync::Arc;

pub type CompileResult<T> = Result<T, CompileError>;

pub struct Compiler {
    pub(crate) config: CompilerConfig,
    pub(crate) next_label: Label,
    pub(crate) scopes: Vec<Scope>,
    pub(crate) next_register: usize,
    pub(crate) functions: FunctionTable,
    pub(crate) members: MemberTable,
    pub(crate) loops: Vec<LoopContext>,
    pub(crate) logger: Arc<Logger>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Self::new_with_config(CompilerConfig::default(), Logger::noop())
    }

    pub fn new_with_logger(logger: Arc<Logger>) -> Self {
        Self::new_with_config(CompilerConfig::default(), logger)
    }

    pub fn new_with_config(config: CompilerConfig, logger: Arc<Logger>) -> Self {
        Compiler {
            config,
            next_label: 0,
            scopes: vec![Scope::default()],
            next_register: 0,
            functions: FunctionTable::default(),
            members: MemberTable::default(),
            loops: Vec::new(),
            logger,
        }
    }

    /// Lower top-level nodes. Labels, registers and ids continue from any
    /// earlier call, so separately compiled programs can be concatenated.
    pub fn compile(&mut self, nodes: &[Node]) -> CompileResult<Vec<Instruction>> {
        // calls may precede the declaration they target
        for node in nodes {
            match node {
                Node::Function(function) => {
                    self.declare_function(FunctionSignature::new(
                        &function.prototype.name,
                        function.prototype.argument_names.clone(),
                        function.prototype.returns,
                    ));
                }
                Node::StructPrototype(prototype) => {
                    self.declare_function(FunctionSignature::new(
                        &prototype.name,
                        prototype.members.clone(),
                        true,
                    ));
                    for member in &prototype.members {
                        self.members.declare(member);
                    }
                }
                _ => {}
            }
        }

        let mut code = Vec::new();
        for node in nodes {
            code.extend(node.compile(self, None)?);
        }

        debug!(
            self.logger,
            "compiled {} nodes into {} instructions ({} registers, {} functions)",
            nodes.len(),
            code.len(),
            self.next_register,
            self.functions.len()
        );
        Ok(code)
    }

    /// Id for a signature, declaring it if new
    pub fn declare_function(&mut self, signature: FunctionSignature) -> usize {
        self.functions.declare(signature)
    }

    pub fn function_id(&self, signature: &FunctionSignature) -> Option<usize> {
        self.functions.id_of(signature)
    }

    pub fn function_signature(&self, id: usize) -> Option<&FunctionSignature> {
        self.functions.signature(id)
    }

    /// Register of a top-level variable, if it has ever been assigned
    pub fn register_for(&self, name: &str) -> Option<usize> {
        self.scopes.first().and_then(|scope| scope.get(name))
    }

    /// Top-level variable held in `register`, the inverse of `register_for`
    pub fn variable_name(&self, register: usize) -> Option<&str> {
        self.scopes.first().and_then(|scope| scope.name_of(register))
    }

    pub fn member_name(&self, id: usize) -> Option<&str> {
        self.members.name(id)
    }

    /// Label the next emitted instruction will get
    pub fn peek_label(&self) -> Label {
        self.next_label
    }

    pub(crate) fn take_label(&mut self) -> Label {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    pub(crate) fn emit(&mut self, opcode: Opcode) -> Instruction {
        Instruction::new(self.take_label(), opcode)
    }

    /// Attach a comment when the config asks for them
    pub(crate) fn annotate(&self, instruction: Instruction, comment: impl FnOnce() -> String) -> Instruction {
        if self.config.emit_comments {
            instruction.with_comment(comment())
        } else {
            instruction
        }
    }

    /// `None` or a body parent means the node is a statement and its value is unused
    pub(crate) fn is_statement_position(parent: Option<&Node>) -> bool {
        matches!(parent, None | Some(Node::Body(_)))
    }

    /// Exhaustive per-variant lowering
    pub(crate) fn lower(&mut self, node: &Node, parent: Option<&Node>) -> CompileResult<Vec<Instruction>> {
        let mut code = match node {
            Node::Number(n) => self.lower_constant((*n).into()),
            Node::Str(s) => self.lower_constant(s.as_str().into()),
            Node::Boolean(b) => self.lower_constant((*b).into()),
            Node::Variable(name) => self.lower_variable(name)?,
            Node::StructMember { variable, name } => self.lower_member_read(node, variable, name)?,
            Node::StructPrototype(prototype) => self.lower_struct(prototype),
            Node::Call(call) => self.lower_call(node, call, parent)?,
            Node::BinaryOp(binary) => self.lower_binary(node, binary)?,
            Node::Assignment(assignment) => self.lower_assignment(node, assignment)?,
            Node::Conditional(conditional) => self.lower_conditional(node, conditional)?,
            Node::While(w) => self.lower_while(node, w)?,
            Node::RepeatWhile(w) => self.lower_repeat_while(node, w)?,
            Node::Do(d) => self.lower_do(node, d)?,
            Node::For(f) => self.lower_for(node, f)?,
            Node::FunctionPrototype(prototype) => {
                self.declare_function(FunctionSignature::new(
                    &prototype.name,
                    prototype.argument_names.clone(),
                    prototype.returns,
                ));
                Vec::new()
            }
            Node::Function(function) => self.lower_function(node, function)?,
            Node::Return(value) => self.lower_return(node, value.as_deref())?,
            Node::Continue => self.lower_loop_jump(false)?,
            Node::Break => self.lower_loop_jump(true)?,
            Node::Body(body) => {
                let mut code = Vec::new();
                for statement in &body.nodes {
                    code.extend(self.lower(statement, Some(node))?);
                }
                code
            }
        };

        // calls decide for themselves, depending on whether the callee returns
        if Self::is_statement_position(parent) && node.is_expression() && !matches!(node, Node::Call(_)) {
            code.push(self.emit(Opcode::Pop));
        }
        Ok(code)
    }
}
