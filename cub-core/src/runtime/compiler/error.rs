/// Lowering failures. Apart from `UndefinedVariable` and `UnresolvedCall`,
/// these mean the tree broke a rule the parser enforces.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("call to unknown function '{name}' with {arity} argument(s)")]
    UnresolvedCall { name: String, arity: usize },
    #[error("unexpected command: {description}")]
    UnexpectedCommand { description: String },
    #[error("'break' outside of a loop")]
    BreakOutsideLoop,
    #[error("'continue' outside of a loop")]
    ContinueOutsideLoop,
}
