//! interpret / resume and the main loop

use super::{operators, Completion, Vm, VmError, VmState};
use crate::runtime::bytecode::{Instruction, Opcode};
use crate::runtime::value::Value;
use cub_log::{debug, error, trace};
use std::collections::BTreeMap;
use std::rc::Rc;

/// How many trailing trace entries a fault report shows
const TRACE_TAIL: usize = 16;

fn malformed(instruction: &Instruction, reason: &'static str) -> VmError {
    VmError::MalformedInstruction {
        label: instruction.label,
        reason,
    }
}

fn index(instruction: &Instruction, position: usize) -> Result<usize, VmError> {
    instruction
        .index_operand(position)
        .ok_or_else(|| malformed(instruction, "missing index operand"))
}

/// Write `value` at `path` inside `members`, nearest member first
fn write_member(
    members: &mut BTreeMap<usize, Value>,
    path: &[usize],
    value: Value,
) -> Result<(), VmError> {
    match path {
        [] => Ok(()),
        [last] => {
            members.insert(*last, value);
            Ok(())
        }
        [first, rest @ ..] => match members.get_mut(first) {
            Some(Value::Struct(inner)) => write_member(inner, rest, value),
            Some(other) => Err(VmError::TypeMismatch {
                operation: Opcode::StructUpdate.name(),
                expected: "a struct",
                found: other.type_name().to_string(),
            }),
            None => Err(VmError::MissingMember { member: *first }),
        },
    }
}

impl Vm {
    /// Run from the start. Returns `Finished`, or `AwaitingExternal` if an
    /// external call was deferred.
    pub fn interpret(&mut self) -> Result<VmState, VmError> {
        if self.state != VmState::Ready {
            return Err(VmError::InvalidState {
                operation: "interpret",
                state: self.state,
            });
        }
        debug!(self.logger, "interpreting {} instructions", self.program.len());
        self.run()
    }

    /// Deliver the result of a deferred external call and keep going
    pub fn resume(&mut self, completion: Completion) -> Result<VmState, VmError> {
        if self.state != VmState::AwaitingExternal {
            return Err(VmError::InvalidState {
                operation: "resume",
                state: self.state,
            });
        }
        self.state = VmState::Running;
        if let Err(e) = self.complete_external(completion) {
            return Err(self.fault(e));
        }
        if self.state == VmState::Running {
            self.run()
        } else {
            Ok(self.state)
        }
    }

    fn run(&mut self) -> Result<VmState, VmError> {
        self.state = VmState::Running;
        while self.state == VmState::Running {
            if self.pc >= self.program.len() {
                self.state = VmState::Finished;
                break;
            }
            self.executed += 1;
            self.record_pc();
            if let Err(e) = self.step() {
                return Err(self.fault(e));
            }
        }
        debug!(
            self.logger,
            "stopped {:?} after {} steps",
            self.state,
            self.executed
        );
        Ok(self.state)
    }

    fn fault(&mut self, e: VmError) -> VmError {
        self.state = VmState::Faulted;
        let tail = &self.pc_trace[self.pc_trace.len().saturating_sub(TRACE_TAIL)..];
        error!(self.logger, "fault at pc {}: {}; recent pcs {:?}", self.pc, e, tail);
        e
    }

    fn step(&mut self) -> Result<(), VmError> {
        let program = Rc::clone(&self.program);
        let instruction = &program[self.pc];
        trace!(self.logger, "{}", instruction);

        let mut next = self.pc + 1;
        match instruction.opcode {
            Opcode::PushConst => {
                let value = instruction
                    .value_operand(0)
                    .ok_or_else(|| malformed(instruction, "missing constant"))?;
                self.push(value.clone())?;
            }

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Pow
            | Opcode::And
            | Opcode::Or
            | Opcode::Eq
            | Opcode::Neq
            | Opcode::Lt
            | Opcode::Le
            | Opcode::Gt
            | Opcode::Ge => {
                let rhs = self.pop()?;
                let lhs = self.pop()?;
                let result = operators::binary(instruction.opcode, lhs, rhs)?;
                self.push(result)?;
            }
            Opcode::Not => {
                let value = self.pop()?;
                self.push(operators::not(value)?)?;
            }

            Opcode::Goto => {
                next = self.jump_target(instruction)?;
            }
            Opcode::IfTrue | Opcode::IfFalse => {
                let condition = self.pop_bool(instruction.opcode.name())?;
                if condition == (instruction.opcode == Opcode::IfTrue) {
                    next = self.jump_target(instruction)?;
                }
            }

            Opcode::RegisterStore | Opcode::RegisterUpdate => {
                let register = index(instruction, 0)?;
                let value = self.pop()?;
                self.registers.insert(register, value);
            }
            Opcode::RegisterLoad => {
                let register = index(instruction, 0)?;
                let value = self.register_value(register)?.clone();
                self.push(value)?;
            }
            Opcode::RegisterClear => {
                self.registers.remove(&index(instruction, 0)?);
            }

            Opcode::StructInit => self.push(Value::Struct(BTreeMap::new()))?,
            Opcode::StructSet => {
                let member = index(instruction, 0)?;
                let value = self.pop()?;
                let mut members = self.pop_struct(instruction.opcode.name())?;
                members.insert(member, value);
                self.push(Value::Struct(members))?;
            }
            Opcode::StructGet => {
                let member = index(instruction, 0)?;
                let mut members = self.pop_struct(instruction.opcode.name())?;
                let value = members
                    .remove(&member)
                    .ok_or(VmError::MissingMember { member })?;
                self.push(value)?;
            }
            Opcode::StructUpdate => {
                let mut path = instruction.indices_from(0);
                if path.is_empty() {
                    return Err(malformed(instruction, "empty member path"));
                }
                path.reverse();
                let mut members = self.pop_struct(instruction.opcode.name())?;
                let value = self.pop()?;
                write_member(&mut members, &path, value)?;
                self.push(Value::Struct(members))?;
            }

            // reached in sequence: skip the body
            Opcode::VirtualHeader => {
                let end = instruction
                    .label_operand(1)
                    .ok_or_else(|| malformed(instruction, "missing end label"))?;
                next = self.resolve(end)?;
            }
            Opcode::VirtualEnd | Opcode::ExitVirtual => {
                next = self.return_from_function()?;
            }
            Opcode::InvokeVirtual => {
                let id = index(instruction, 0)?;
                next = self.invoke(id, next)?;
            }

            Opcode::Pop => {
                self.pop()?;
            }
        }

        self.pc = next;
        Ok(())
    }

    fn jump_target(&self, instruction: &Instruction) -> Result<usize, VmError> {
        let label = instruction
            .label_operand(0)
            .ok_or_else(|| malformed(instruction, "missing jump target"))?;
        self.resolve(label)
    }
}
