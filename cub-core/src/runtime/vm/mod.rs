//! Bytecode virtual machine
//!
//! Single-threaded fetch/decode/execute over a register bank and an
//! evaluation stack. The one suspension point is an external call whose
//! callback answers `Deferred`: the VM parks in `AwaitingExternal` until the
//! host calls `resume`.

mod call;
mod counter;
mod error;
mod execution;
mod external;
mod operators;

pub use counter::{Counter, CounterError};
pub use error::VmError;
pub use external::{Completion, ExternalArguments, ExternalFunction, ExternalReply};

use crate::runtime::bytecode::{Instruction, Label, Opcode};
use crate::runtime::value::Value;
use cub_config::LimitConfig;
use cub_log::Logger;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Ready,
    Running,
    /// Parked on an external call; continue with `Vm::resume`
    AwaitingExternal,
    Finished,
    Faulted,
}

/// Activation record of a source-defined function
#[derive(Debug)]
struct Frame {
    return_pc: usize,
    /// The callee's owned registers as they were before the call
    saved: Vec<(usize, Option<Value>)>,
}

pub struct Vm {
    program: Rc<[Instruction]>,
    /// Label to instruction index
    labels: HashMap<Label, usize>,
    /// Label one past the last instruction; jumping there finishes the run
    end_label: Label,
    /// Function id to the index of its `VirtualHeader`
    functions: HashMap<usize, usize>,
    externals: HashMap<usize, ExternalFunction>,

    pc: usize,
    stack: Vec<Value>,
    registers: BTreeMap<usize, Value>,
    frames: Vec<Frame>,
    call_depth: Counter,
    pc_trace: Vec<usize>,
    executed: u64,
    state: VmState,
    aborted: bool,

    limits: LimitConfig,
    logger: Arc<Logger>,
}

impl Vm {
    /// Load a program. Labels must be strictly increasing and function
    /// headers well formed.
    pub fn new(program: Vec<Instruction>) -> Result<Self, VmError> {
        Self::new_with_logger(program, Logger::noop())
    }

    pub fn new_with_logger(program: Vec<Instruction>, logger: Arc<Logger>) -> Result<Self, VmError> {
        let mut labels = HashMap::with_capacity(program.len());
        let mut functions = HashMap::new();
        let mut previous: Option<Label> = None;

        for (index, instruction) in program.iter().enumerate() {
            if previous.is_some_and(|p| instruction.label <= p) {
                return Err(VmError::MalformedInstruction {
                    label: instruction.label,
                    reason: "labels must be strictly increasing",
                });
            }
            previous = Some(instruction.label);
            labels.insert(instruction.label, index);

            if instruction.opcode == Opcode::VirtualHeader {
                let (Some(id), Some(_)) = (instruction.index_operand(0), instruction.label_operand(1)) else {
                    return Err(VmError::MalformedInstruction {
                        label: instruction.label,
                        reason: "function header needs an id and an end label",
                    });
                };
                functions.insert(id, index);
            }
        }

        let end_label = previous.map(|label| label + 1).unwrap_or(0);

        Ok(Vm {
            program: program.into(),
            labels,
            end_label,
            functions,
            externals: HashMap::new(),
            pc: 0,
            stack: Vec::new(),
            registers: BTreeMap::new(),
            frames: Vec::new(),
            call_depth: Counter::default(),
            pc_trace: Vec::new(),
            executed: 0,
            state: VmState::Ready,
            aborted: false,
            limits: LimitConfig::default(),
            logger,
        })
    }

    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    /// `id` must be the id the compiler assigned to the function's signature
    pub fn register_external(&mut self, id: usize, function: ExternalFunction) {
        self.externals.insert(id, function);
    }

    /// Back to `Ready` with an empty register bank; the program and externals stay
    pub fn reset(&mut self) {
        self.pc = 0;
        self.stack.clear();
        self.registers.clear();
        self.frames.clear();
        self.call_depth = Counter::default();
        self.pc_trace.clear();
        self.executed = 0;
        self.state = VmState::Ready;
        self.aborted = false;
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    /// True when an external function stopped the run
    pub fn was_aborted(&self) -> bool {
        self.aborted
    }

    pub fn program(&self) -> &[Instruction] {
        &self.program
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Instruction indices executed so far, in order. Once the trace reaches
    /// `LimitConfig::max_trace_len` the older half is dropped, so long runs
    /// keep only their recent history.
    pub fn pc_trace(&self) -> &[usize] {
        &self.pc_trace
    }

    /// Instructions executed since the last reset, including any dropped from the trace
    pub fn instructions_executed(&self) -> u64 {
        self.executed
    }

    fn record_pc(&mut self) {
        let cap = self.limits.max_trace_len;
        if cap == 0 {
            return;
        }
        if self.pc_trace.len() >= cap {
            self.pc_trace.drain(..self.pc_trace.len() - cap / 2);
        }
        self.pc_trace.push(self.pc);
    }

    pub fn stack(&self) -> &[Value] {
        &self.stack
    }

    pub fn registers(&self) -> &BTreeMap<usize, Value> {
        &self.registers
    }

    pub fn register_value(&self, register: usize) -> Result<&Value, VmError> {
        self.registers
            .get(&register)
            .ok_or(VmError::RegisterNotFound { register })
    }

    pub fn call_depth(&self) -> u64 {
        self.call_depth.value()
    }

    fn push(&mut self, value: Value) -> Result<(), VmError> {
        if self.stack.len() >= self.limits.max_stack_size {
            return Err(VmError::StackOverflow {
                limit: self.limits.max_stack_size,
            });
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow)
    }

    fn pop_struct(&mut self, operation: &'static str) -> Result<BTreeMap<usize, Value>, VmError> {
        match self.pop()? {
            Value::Struct(members) => Ok(members),
            other => Err(VmError::TypeMismatch {
                operation,
                expected: "a struct",
                found: other.type_name().to_string(),
            }),
        }
    }

    fn pop_bool(&mut self, operation: &'static str) -> Result<bool, VmError> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(VmError::TypeMismatch {
                operation,
                expected: "a boolean",
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Instruction index for a jump target
    fn resolve(&self, label: Label) -> Result<usize, VmError> {
        if label == self.end_label {
            return Ok(self.program.len());
        }
        self.labels
            .get(&label)
            .copied()
            .ok_or(VmError::UnknownLabel { label })
    }
}
