//! Function invocation, return and external calls

use super::{Completion, ExternalArguments, ExternalReply, Frame, Vm, VmError, VmState};
use cub_log::{debug, info};
use std::collections::BTreeMap;

impl Vm {
    /// Start a call. Returns the index to continue at.
    pub(super) fn invoke(&mut self, id: usize, return_pc: usize) -> Result<usize, VmError> {
        if let Some(&header) = self.functions.get(&id) {
            let limit = self.limits.max_recursion_depth;
            if self.call_depth.value() >= limit as u64 {
                return Err(VmError::CallDepthExceeded { limit });
            }

            // the callee starts with its own registers empty; the caller's values come back on return
            let owned = self.program[header].indices_from(2);
            let saved = owned
                .into_iter()
                .map(|register| (register, self.registers.remove(&register)))
                .collect();
            self.frames.push(Frame { return_pc, saved });
            self.call_depth.increment();
            return Ok(header + 1);
        }

        let Some(external) = self.externals.get(&id).cloned() else {
            return Err(VmError::UnknownFunction { id });
        };

        let mut values = BTreeMap::new();
        for name in external.argument_names.iter().rev() {
            values.insert(name.clone(), self.pop()?);
        }

        match external.call(&ExternalArguments::new(values))? {
            ExternalReply::Done(completion) => self.complete_external(completion)?,
            ExternalReply::Deferred => {
                debug!(self.logger, "external function #{} deferred", id);
                self.state = VmState::AwaitingExternal;
            }
        }
        Ok(return_pc)
    }

    /// Leave the current function. With no caller the program halts.
    pub(super) fn return_from_function(&mut self) -> Result<usize, VmError> {
        let Some(frame) = self.frames.pop() else {
            debug!(self.logger, "return at top level halts the program");
            return Ok(self.program.len());
        };

        for (register, value) in frame.saved {
            match value {
                Some(value) => {
                    self.registers.insert(register, value);
                }
                None => {
                    self.registers.remove(&register);
                }
            }
        }
        self.call_depth.decrement()?;
        Ok(frame.return_pc)
    }

    pub(super) fn complete_external(&mut self, completion: Completion) -> Result<(), VmError> {
        if let Some(value) = completion.value {
            self.push(value)?;
        }
        if !completion.proceed {
            info!(self.logger, "external function stopped the program");
            self.aborted = true;
            self.state = VmState::Finished;
        }
        Ok(())
    }
}
