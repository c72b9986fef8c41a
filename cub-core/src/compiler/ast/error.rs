/// Rejected right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{value} cannot be assigned to a variable")]
pub struct AssignmentValueError {
    /// Description of the rejected node
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    #[error(transparent)]
    InvalidAssignmentValue(#[from] AssignmentValueError),
    #[error("{target} is not an assignable target")]
    InvalidAssignmentTarget { target: String },
    #[error("illegal operands for '{operator}': {reason}")]
    IllegalBinaryOperation {
        operator: &'static str,
        reason: String,
    },
    #[error("illegal {statement}: {reason}")]
    IllegalStatement {
        statement: &'static str,
        reason: String,
    },
}
