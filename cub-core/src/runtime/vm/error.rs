use super::counter::CounterError;
use super::VmState;
use crate::runtime::bytecode::Label;

/// Runtime faults. Registers keep whatever state execution had reached.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VmError {
    #[error("evaluation stack underflow")]
    StackUnderflow,
    #[error("evaluation stack exceeded {limit} values")]
    StackOverflow { limit: usize },
    #[error("{operation} expects {expected}, found {found}")]
    TypeMismatch {
        operation: &'static str,
        expected: &'static str,
        found: String,
    },
    #[error("register r{register} has no value")]
    RegisterNotFound { register: usize },
    #[error("no instruction with label {label}")]
    UnknownLabel { label: Label },
    #[error("no function with id {id}")]
    UnknownFunction { id: usize },
    #[error("struct has no member #{member}")]
    MissingMember { member: usize },
    #[error("division by zero")]
    DivisionByZero,
    #[error("malformed instruction at label {label}: {reason}")]
    MalformedInstruction { label: Label, reason: &'static str },
    #[error("call depth {0}")]
    Underflow(#[from] CounterError),
    #[error("call depth exceeded {limit}")]
    CallDepthExceeded { limit: usize },
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: VmState,
    },
}
