//! Lowering of value-producing nodes and assignments

use super::{CompileError, CompileResult, Compiler};
use crate::compiler::ast::{Assignment, BinaryOp, BinaryOperator, Call, Node};
use crate::runtime::bytecode::{Instruction, Opcode};
use crate::runtime::value::Value;

fn operator_opcode(op: BinaryOperator) -> Opcode {
    match op {
        BinaryOperator::Add => Opcode::Add,
        BinaryOperator::Sub => Opcode::Sub,
        BinaryOperator::Mul => Opcode::Mul,
        BinaryOperator::Div => Opcode::Div,
        BinaryOperator::Pow => Opcode::Pow,
        BinaryOperator::And => Opcode::And,
        BinaryOperator::Or => Opcode::Or,
        BinaryOperator::Not => Opcode::Not,
        BinaryOperator::Eq => Opcode::Eq,
        BinaryOperator::Neq => Opcode::Neq,
        BinaryOperator::Lt => Opcode::Lt,
        BinaryOperator::Le => Opcode::Le,
        BinaryOperator::Gt => Opcode::Gt,
        BinaryOperator::Ge => Opcode::Ge,
    }
}

impl Compiler {
    pub(crate) fn lower_constant(&mut self, value: Value) -> Vec<Instruction> {
        vec![self.emit(Opcode::PushConst).with_value(value)]
    }

    /// A bare function name evaluates to a function reference
    pub(crate) fn lower_variable(&mut self, name: &str) -> CompileResult<Vec<Instruction>> {
        if let Some(register) = self.lookup(name) {
            let load = self.emit(Opcode::RegisterLoad).with_index(register);
            return Ok(vec![self.annotate(load, || name.to_string())]);
        }
        if let Some(id) = self.functions.resolve_name(name) {
            let push = self.emit(Opcode::PushConst).with_value(Value::Function(id));
            return Ok(vec![self.annotate(push, || format!("function {name}"))]);
        }
        Err(CompileError::UndefinedVariable {
            name: name.to_string(),
        })
    }

    pub(crate) fn lower_member_read(
        &mut self,
        node: &Node,
        variable: &Node,
        name: &str,
    ) -> CompileResult<Vec<Instruction>> {
        let mut code = self.lower(variable, Some(node))?;
        let member = self.member_id(name)?;
        let get = self.emit(Opcode::StructGet).with_index(member);
        code.push(self.annotate(get, || name.to_string()));
        Ok(code)
    }

    pub(crate) fn lower_call(
        &mut self,
        node: &Node,
        call: &Call,
        parent: Option<&Node>,
    ) -> CompileResult<Vec<Instruction>> {
        let arity = call.arguments.len();
        let id = self
            .functions
            .resolve(&call.callee, arity)
            .ok_or_else(|| CompileError::UnresolvedCall {
                name: call.callee.clone(),
                arity,
            })?;
        let returns = self
            .functions
            .signature(id)
            .map(|signature| signature.returns)
            .unwrap_or(false);

        let mut code = Vec::new();
        for argument in &call.arguments {
            code.extend(self.lower(argument, Some(node))?);
        }
        let invoke = self.emit(Opcode::InvokeVirtual).with_index(id);
        code.push(self.annotate(invoke, || call.callee.clone()));

        if returns && Self::is_statement_position(parent) {
            code.push(self.emit(Opcode::Pop));
        }
        Ok(code)
    }

    pub(crate) fn lower_binary(&mut self, node: &Node, binary: &BinaryOp) -> CompileResult<Vec<Instruction>> {
        let mut code = self.lower(binary.lhs(), Some(node))?;
        if let Some(rhs) = binary.rhs() {
            code.extend(self.lower(rhs, Some(node))?);
        }
        code.push(self.emit(operator_opcode(binary.op())));
        Ok(code)
    }

    pub(crate) fn lower_assignment(
        &mut self,
        node: &Node,
        assignment: &Assignment,
    ) -> CompileResult<Vec<Instruction>> {
        match assignment.variable() {
            Node::Variable(name) => {
                let mut code = self.lower(assignment.value(), Some(node))?;
                let (register, is_new) = self.register(name);
                let opcode = if is_new {
                    Opcode::RegisterStore
                } else {
                    Opcode::RegisterUpdate
                };
                let store = self.emit(opcode).with_index(register);
                code.push(self.annotate(store, || name.clone()));
                Ok(code)
            }
            target @ Node::StructMember { .. } => self.lower_member_assignment(node, target, assignment.value()),
            other => Err(CompileError::UnexpectedCommand {
                description: format!("cannot assign to {}", other.description()),
            }),
        }
    }

    /// Id of a member some struct declared
    fn member_id(&self, name: &str) -> CompileResult<usize> {
        self.members.lookup(name).ok_or_else(|| CompileError::UnexpectedCommand {
            description: format!("no struct declares a member '{name}'"),
        })
    }

    /// `a.b.c = v`: load `a`, write `v` at path [c, b], store `a` back
    fn lower_member_assignment(
        &mut self,
        node: &Node,
        target: &Node,
        value: &Node,
    ) -> CompileResult<Vec<Instruction>> {
        let mut path = Vec::new();
        let mut names = Vec::new();
        let mut cursor = target;
        let root = loop {
            match cursor {
                Node::StructMember { variable, name } => {
                    path.push(self.member_id(name)?);
                    names.push(name.as_str());
                    cursor = variable;
                }
                Node::Variable(root) => break root,
                other => {
                    return Err(CompileError::UnexpectedCommand {
                        description: format!("member chain rooted at {}", other.description()),
                    })
                }
            }
        };

        let register = self.lookup(root).ok_or_else(|| CompileError::UnexpectedCommand {
            description: format!("assignment to a member of '{root}' before '{root}' is assigned"),
        })?;

        let mut code = self.lower(value, Some(node))?;
        let load = self.emit(Opcode::RegisterLoad).with_index(register);
        code.push(self.annotate(load, || root.clone()));

        let mut update = self.emit(Opcode::StructUpdate);
        for &member in &path {
            update = update.with_index(member);
        }
        code.push(self.annotate(update, || {
            let mut dotted: Vec<&str> = names.iter().rev().copied().collect();
            dotted.insert(0, root);
            dotted.join(".")
        }));

        let store = self.emit(Opcode::RegisterUpdate).with_index(register);
        code.push(self.annotate(store, || root.clone()));
        Ok(code)
    }
}
