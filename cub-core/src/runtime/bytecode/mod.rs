//! Labeled bytecode instructions

mod instruction;

pub use instruction::{disassemble, Instruction, Label, Opcode, Operand};
