//! Host-implemented functions

use super::VmError;
use crate::runtime::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Arguments of an external call, by declared name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalArguments {
    values: BTreeMap<String, Value>,
}

impl ExternalArguments {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        ExternalArguments { values }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Outcome of an external call
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Pushed for the caller when present
    pub value: Option<Value>,
    /// `false` stops the program
    pub proceed: bool,
}

impl Completion {
    pub fn with_value(value: impl Into<Value>) -> Self {
        Completion {
            value: Some(value.into()),
            proceed: true,
        }
    }

    pub fn done() -> Self {
        Completion {
            value: None,
            proceed: true,
        }
    }

    pub fn abort() -> Self {
        Completion {
            value: None,
            proceed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExternalReply {
    Done(Completion),
    /// The host completes later through `Vm::resume`
    Deferred,
}

type Callback = dyn FnMut(&ExternalArguments) -> ExternalReply;

/// A host callback plus its declared argument names. Clones share the callback.
#[derive(Clone)]
pub struct ExternalFunction {
    pub argument_names: Vec<String>,
    callback: Rc<RefCell<Callback>>,
}

impl ExternalFunction {
    pub fn new<F>(argument_names: Vec<String>, callback: F) -> Self
    where
        F: FnMut(&ExternalArguments) -> ExternalReply + 'static,
    {
        ExternalFunction {
            argument_names,
            callback: Rc::new(RefCell::new(callback)),
        }
    }

    pub(crate) fn call(&self, arguments: &ExternalArguments) -> Result<ExternalReply, VmError> {
        let mut callback = self
            .callback
            .try_borrow_mut()
            .map_err(|_| VmError::InvalidState {
                operation: "re-enter an external function",
                state: super::VmState::Running,
            })?;
        Ok((&mut *callback)(arguments))
    }
}

impl fmt::Debug for ExternalFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalFunction")
            .field("argument_names", &self.argument_names)
            .finish_non_exhaustive()
    }
}
