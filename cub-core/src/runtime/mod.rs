//! Back end: bytecode compiler, instruction model, values and the VM

pub mod bytecode;
pub mod compiler;
pub mod value;
pub mod vm;

pub use bytecode::{Instruction, Label, Opcode, Operand};
pub use compiler::{CompileError, Compiler};
pub use value::Value;
pub use vm::{Vm, VmError, VmState};
