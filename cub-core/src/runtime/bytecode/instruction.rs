use crate::runtime::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of an instruction; also the jump target naming it
pub type Label = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    PushConst,

    Add,
    Sub,
    Mul,
    Div,
    Pow,

    And,
    Or,
    Not,

    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    Goto,
    IfTrue,
    IfFalse,

    RegisterStore,
    RegisterUpdate,
    RegisterLoad,
    RegisterClear,

    StructInit,
    StructSet,
    StructGet,
    StructUpdate,

    VirtualHeader,
    VirtualEnd,
    InvokeVirtual,
    ExitVirtual,

    Pop,
}

impl Opcode {
    pub fn name(&self) -> &'static str {
        match self {
            Opcode::PushConst => "push_const",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Pow => "pow",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Not => "not",
            Opcode::Eq => "eq",
            Opcode::Neq => "neq",
            Opcode::Lt => "lt",
            Opcode::Le => "le",
            Opcode::Gt => "gt",
            Opcode::Ge => "ge",
            Opcode::Goto => "goto",
            Opcode::IfTrue => "if_true",
            Opcode::IfFalse => "if_false",
            Opcode::RegisterStore => "reg_store",
            Opcode::RegisterUpdate => "reg_update",
            Opcode::RegisterLoad => "reg_load",
            Opcode::RegisterClear => "reg_clear",
            Opcode::StructInit => "struct_init",
            Opcode::StructSet => "struct_set",
            Opcode::StructGet => "struct_get",
            Opcode::StructUpdate => "struct_update",
            Opcode::VirtualHeader => "virtual_header",
            Opcode::VirtualEnd => "virtual_end",
            Opcode::InvokeVirtual => "invoke_virtual",
            Opcode::ExitVirtual => "exit_virtual",
            Opcode::Pop => "pop",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Register index, function id or member id
    Index(usize),
    Value(Value),
    Label(Label),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Index(i) => write!(f, "r{i}"),
            Operand::Value(Value::String(s)) => write!(f, "{s:?}"),
            Operand::Value(v) => write!(f, "{v}"),
            Operand::Label(l) => write!(f, "@{l}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub label: Label,
    pub opcode: Opcode,
    pub operands: Vec<Operand>,
    pub comment: String,
}

impl Instruction {
    pub fn new(label: Label, opcode: Opcode) -> Self {
        Instruction {
            label,
            opcode,
            operands: Vec::new(),
            comment: String::new(),
        }
    }

    pub fn with_operand(mut self, operand: Operand) -> Self {
        self.operands.push(operand);
        self
    }

    pub fn with_index(self, index: usize) -> Self {
        self.with_operand(Operand::Index(index))
    }

    pub fn with_value(self, value: Value) -> Self {
        self.with_operand(Operand::Value(value))
    }

    pub fn with_target(self, label: Label) -> Self {
        self.with_operand(Operand::Label(label))
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn index_operand(&self, position: usize) -> Option<usize> {
        match self.operands.get(position) {
            Some(Operand::Index(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn value_operand(&self, position: usize) -> Option<&Value> {
        match self.operands.get(position) {
            Some(Operand::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn label_operand(&self, position: usize) -> Option<Label> {
        match self.operands.get(position) {
            Some(Operand::Label(l)) => Some(*l),
            _ => None,
        }
    }

    /// Every `Index` operand from `position` on
    pub fn indices_from(&self, position: usize) -> Vec<usize> {
        self.operands
            .iter()
            .skip(position)
            .filter_map(|operand| match operand {
                Operand::Index(i) => Some(*i),
                _ => None,
            })
            .collect()
    }

    /// Opcode and operands without the label or comment, for comparing code shape
    pub fn shape(&self) -> (Opcode, &[Operand]) {
        (self.opcode, &self.operands)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}: {:<15}", self.label, self.opcode.name())?;
        let operands: Vec<String> = self.operands.iter().map(|o| o.to_string()).collect();
        write!(f, "{:<20}", operands.join(" "))?;
        if !self.comment.is_empty() {
            write!(f, " ; {}", self.comment)?;
        }
        Ok(())
    }
}

/// One instruction per line
pub fn disassemble(instructions: &[Instruction]) -> String {
    instructions
        .iter()
        .map(|i| i.to_string().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let instruction = Instruction::new(7, Opcode::VirtualHeader)
            .with_index(2)
            .with_target(12)
            .with_index(4)
            .with_index(5);

        assert_eq!(instruction.index_operand(0), Some(2));
        assert_eq!(instruction.label_operand(1), Some(12));
        assert_eq!(instruction.label_operand(0), None);
        assert_eq!(instruction.indices_from(2), vec![4, 5]);
    }

    #[test]
    fn test_display() {
        let instruction = Instruction::new(3, Opcode::RegisterStore)
            .with_index(0)
            .with_comment("x");
        assert_eq!(instruction.to_string().trim_end(), "    3: reg_store      r0                   ; x");
    }

    #[test]
    fn test_disassemble_string_constant() {
        let code = vec![Instruction::new(0, Opcode::PushConst).with_value(Value::from("hi"))];
        assert_eq!(disassemble(&code), "    0: push_const     \"hi\"");
    }

    #[test]
    fn test_json_round_trip() {
        let instruction = Instruction::new(1, Opcode::PushConst).with_value(Value::Number(2.0));
        let json = serde_json::to_string(&instruction).unwrap();
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instruction);
    }
}
