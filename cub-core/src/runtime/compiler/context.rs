//! Compile-time tables: function ids, member ids, loop bookkeeping

use crate::runtime::bytecode::{Instruction, Label, Operand};
use std::collections::HashMap;

/// Identity of a function. Source declarations and host registrations with
/// equal signatures get the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub name: String,
    pub argument_names: Vec<String>,
    pub returns: bool,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, argument_names: Vec<String>, returns: bool) -> Self {
        FunctionSignature {
            name: name.into(),
            argument_names,
            returns,
        }
    }

    pub fn arity(&self) -> usize {
        self.argument_names.len()
    }
}

/// Signature to id, handed out in first-seen order
#[derive(Debug, Default)]
pub struct FunctionTable {
    ids: HashMap<FunctionSignature, usize>,
    signatures: Vec<FunctionSignature>,
    /// (name, arity) to the most recently declared id
    by_call_shape: HashMap<(String, usize), usize>,
}

impl FunctionTable {
    pub fn declare(&mut self, signature: FunctionSignature) -> usize {
        if let Some(&id) = self.ids.get(&signature) {
            return id;
        }
        let id = self.signatures.len();
        self.by_call_shape
            .insert((signature.name.clone(), signature.arity()), id);
        self.ids.insert(signature.clone(), id);
        self.signatures.push(signature);
        id
    }

    pub fn id_of(&self, signature: &FunctionSignature) -> Option<usize> {
        self.ids.get(signature).copied()
    }

    pub fn resolve(&self, name: &str, arity: usize) -> Option<usize> {
        self.by_call_shape.get(&(name.to_string(), arity)).copied()
    }

    /// Any function with this name, newest first
    pub fn resolve_name(&self, name: &str) -> Option<usize> {
        self.signatures.iter().rposition(|s| s.name == name)
    }

    pub fn signature(&self, id: usize) -> Option<&FunctionSignature> {
        self.signatures.get(id)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// Member name to id, shared by every struct. Only struct declarations add
/// names; member accesses look them up.
#[derive(Debug, Default)]
pub struct MemberTable {
    ids: HashMap<String, usize>,
    names: Vec<String>,
}

impl MemberTable {
    pub fn declare(&mut self, name: &str) -> usize {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.ids.insert(name.to_string(), id);
        self.names.push(name.to_string());
        id
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: usize) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }
}

/// Labels of `break`/`continue` jumps waiting for their loop's targets
#[derive(Debug, Default)]
pub struct LoopContext {
    pub breaks: Vec<Label>,
    pub continues: Vec<Label>,
}

impl LoopContext {
    /// Point the pending jumps in `code` at the loop's exit and continue targets
    pub fn patch(&self, code: &mut [Instruction], exit: Label, resume: Label) {
        for instruction in code.iter_mut() {
            if self.breaks.contains(&instruction.label) {
                instruction.operands = vec![Operand::Label(exit)];
            } else if self.continues.contains(&instruction.label) {
                instruction.operands = vec![Operand::Label(resume)];
            }
        }
    }
}
