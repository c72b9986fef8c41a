//! Cub abstract syntax tree
//!
//! A closed set of node variants. Nodes with structural rules (assignments,
//! operators, loops) can only be built through fallible constructors, so a
//! tree that exists has already passed those checks.

mod error;
mod node;

pub use error::{AssignmentValueError, NodeError};
pub use node::{
    Assignment, BinaryOp, BinaryOperator, Body, Call, Conditional, Do, For, Function,
    FunctionPrototype, Node, StructPrototype, While,
};
