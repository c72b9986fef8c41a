use super::error::{AssignmentValueError, NodeError};
use crate::runtime::bytecode::Instruction;
use crate::runtime::compiler::{CompileError, Compiler};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    And,
    Or,
    /// The only unary operator: `!x` has no right-hand side
    Not,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Pow => "^",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
            BinaryOperator::Not => "!",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
        }
    }

    pub fn is_unary(&self) -> bool {
        matches!(self, BinaryOperator::Not)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Number(f64),
    Str(String),
    Boolean(bool),
    Variable(String),
    /// `variable.name`; `variable` is a `Variable` or another `StructMember`
    StructMember {
        variable: Box<Node>,
        name: String,
    },
    StructPrototype(StructPrototype),
    Call(Call),
    BinaryOp(BinaryOp),
    Assignment(Assignment),
    Conditional(Conditional),
    While(While),
    RepeatWhile(While),
    Do(Do),
    For(For),
    FunctionPrototype(FunctionPrototype),
    Function(Function),
    Return(Option<Box<Node>>),
    Continue,
    Break,
    Body(Body),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Body {
    pub nodes: Vec<Node>,
}

impl Body {
    pub fn new(nodes: Vec<Node>) -> Self {
        Body { nodes }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructPrototype {
    pub name: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: String,
    pub arguments: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionPrototype {
    pub name: String,
    pub argument_names: Vec<String>,
    pub returns: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub prototype: FunctionPrototype,
    body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    op: BinaryOperator,
    lhs: Box<Node>,
    rhs: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    variable: Box<Node>,
    value: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    condition: Box<Node>,
    body: Box<Node>,
    else_body: Option<Box<Node>>,
}

/// Shared by `while` and `repeat ... while`
#[derive(Debug, Clone, PartialEq)]
pub struct While {
    condition: Box<Node>,
    body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Do {
    amount: Box<Node>,
    body: Box<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct For {
    assignment: Box<Node>,
    condition: Box<Node>,
    interval: Box<Node>,
    body: Box<Node>,
}

fn require_expression(node: &Node, statement: &'static str, role: &str) -> Result<(), NodeError> {
    if node.is_expression() {
        Ok(())
    } else {
        Err(NodeError::IllegalStatement {
            statement,
            reason: format!("{role} must be an expression, found {}", node.description()),
        })
    }
}

impl Function {
    pub fn new(prototype: FunctionPrototype, body: Body) -> Self {
        Function {
            prototype,
            body: Box::new(Node::Body(body)),
        }
    }

    /// Always a `Node::Body`
    pub fn body(&self) -> &Node {
        &self.body
    }
}

impl BinaryOp {
    /// `rhs` must be present for every operator except `Not`, and absent for `Not`
    pub fn new(op: BinaryOperator, lhs: Node, rhs: Option<Node>) -> Result<Self, NodeError> {
        let illegal = |reason: String| NodeError::IllegalBinaryOperation {
            operator: op.symbol(),
            reason,
        };

        match (&rhs, op.is_unary()) {
            (Some(_), true) => return Err(illegal("unary operator takes one operand".into())),
            (None, false) => return Err(illegal("missing right-hand operand".into())),
            _ => {}
        }
        for operand in std::iter::once(&lhs).chain(rhs.as_ref()) {
            if !operand.is_expression() {
                return Err(illegal(format!("{} is not a value", operand.description())));
            }
        }

        Ok(BinaryOp {
            op,
            lhs: Box::new(lhs),
            rhs: rhs.map(Box::new),
        })
    }

    pub fn op(&self) -> BinaryOperator {
        self.op
    }

    pub fn lhs(&self) -> &Node {
        &self.lhs
    }

    pub fn rhs(&self) -> Option<&Node> {
        self.rhs.as_deref()
    }
}

impl Assignment {
    /// The target must be a variable or member chain. The value must be a
    /// number, string, variable, member, call or binary operation; boolean
    /// literals and block forms are rejected.
    pub fn new(variable: Node, value: Node) -> Result<Self, NodeError> {
        if !matches!(variable, Node::Variable(_) | Node::StructMember { .. }) {
            return Err(NodeError::InvalidAssignmentTarget {
                target: variable.description(),
            });
        }

        let allowed = matches!(
            value,
            Node::Number(_)
                | Node::Variable(_)
                | Node::StructMember { .. }
                | Node::Call(_)
                | Node::BinaryOp(_)
                | Node::Str(_)
        );
        if !allowed {
            return Err(AssignmentValueError {
                value: value.description(),
            }
            .into());
        }

        Ok(Assignment {
            variable: Box::new(variable),
            value: Box::new(value),
        })
    }

    pub fn variable(&self) -> &Node {
        &self.variable
    }

    pub fn value(&self) -> &Node {
        &self.value
    }
}

impl Conditional {
    pub fn new(condition: Node, body: Body, else_body: Option<Body>) -> Result<Self, NodeError> {
        require_expression(&condition, "if statement", "condition")?;
        Ok(Conditional {
            condition: Box::new(condition),
            body: Box::new(Node::Body(body)),
            else_body: else_body.map(|b| Box::new(Node::Body(b))),
        })
    }

    pub fn condition(&self) -> &Node {
        &self.condition
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn else_body(&self) -> Option<&Node> {
        self.else_body.as_deref()
    }
}

impl While {
    pub fn new(condition: Node, body: Body) -> Result<Self, NodeError> {
        require_expression(&condition, "loop", "condition")?;
        Ok(While {
            condition: Box::new(condition),
            body: Box::new(Node::Body(body)),
        })
    }

    pub fn condition(&self) -> &Node {
        &self.condition
    }

    pub fn body(&self) -> &Node {
        &self.body
    }
}

impl Do {
    pub fn new(amount: Node, body: Body) -> Result<Self, NodeError> {
        require_expression(&amount, "do loop", "repeat count")?;
        Ok(Do {
            amount: Box::new(amount),
            body: Box::new(Node::Body(body)),
        })
    }

    pub fn amount(&self) -> &Node {
        &self.amount
    }

    pub fn body(&self) -> &Node {
        &self.body
    }
}

impl For {
    /// `for assignment, condition, interval { body }`; the interval may be an
    /// assignment (`i += 1`) or any expression
    pub fn new(assignment: Node, condition: Node, interval: Node, body: Body) -> Result<Self, NodeError> {
        if !matches!(assignment, Node::Assignment(_)) {
            return Err(NodeError::IllegalStatement {
                statement: "for loop",
                reason: format!("expected an assignment, found {}", assignment.description()),
            });
        }
        require_expression(&condition, "for loop", "condition")?;
        if !matches!(interval, Node::Assignment(_)) {
            require_expression(&interval, "for loop", "interval")?;
        }

        Ok(For {
            assignment: Box::new(assignment),
            condition: Box::new(condition),
            interval: Box::new(interval),
            body: Box::new(Node::Body(body)),
        })
    }

    pub fn assignment(&self) -> &Node {
        &self.assignment
    }

    pub fn condition(&self) -> &Node {
        &self.condition
    }

    pub fn interval(&self) -> &Node {
        &self.interval
    }

    pub fn body(&self) -> &Node {
        &self.body
    }
}

impl Node {
    /// Lower this node; `parent` is `None` or a `Body` when the node sits in statement position
    pub fn compile(
        &self,
        compiler: &mut Compiler,
        parent: Option<&Node>,
    ) -> Result<Vec<Instruction>, CompileError> {
        compiler.lower(self, parent)
    }

    /// Nodes that produce a value when evaluated
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            Node::Number(_)
                | Node::Str(_)
                | Node::Boolean(_)
                | Node::Variable(_)
                | Node::StructMember { .. }
                | Node::Call(_)
                | Node::BinaryOp(_)
        )
    }

    pub fn child_nodes(&self) -> Vec<&Node> {
        match self {
            Node::Number(_)
            | Node::Str(_)
            | Node::Boolean(_)
            | Node::Variable(_)
            | Node::StructPrototype(_)
            | Node::FunctionPrototype(_)
            | Node::Continue
            | Node::Break => Vec::new(),
            Node::StructMember { variable, .. } => vec![variable],
            Node::Call(call) => call.arguments.iter().collect(),
            Node::BinaryOp(binary) => std::iter::once(binary.lhs()).chain(binary.rhs()).collect(),
            Node::Assignment(assignment) => vec![assignment.variable(), assignment.value()],
            Node::Conditional(conditional) => {
                let mut children = vec![conditional.condition(), conditional.body()];
                children.extend(conditional.else_body());
                children
            }
            Node::While(w) | Node::RepeatWhile(w) => vec![w.condition(), w.body()],
            Node::Do(d) => vec![d.amount(), d.body()],
            Node::For(f) => vec![f.assignment(), f.condition(), f.interval(), f.body()],
            Node::Function(function) => vec![function.body()],
            Node::Return(value) => value.iter().map(|v| &**v).collect(),
            Node::Body(body) => body.nodes.iter().collect(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            Node::Number(n) => format!("number {n}"),
            Node::Str(s) => format!("string \"{s}\""),
            Node::Boolean(b) => format!("boolean {b}"),
            Node::Variable(name) => format!("variable {name}"),
            Node::StructMember { .. } => format!("member {}", self.member_path_text()),
            Node::StructPrototype(s) => format!("struct {}({})", s.name, s.members.join(", ")),
            Node::Call(call) => format!("call {}/{}", call.callee, call.arguments.len()),
            Node::BinaryOp(binary) => format!("operator {}", binary.op().symbol()),
            Node::Assignment(assignment) => {
                format!("assignment to {}", assignment.variable().member_path_text())
            }
            Node::Conditional(c) => {
                if c.else_body().is_some() {
                    "if/else statement".to_string()
                } else {
                    "if statement".to_string()
                }
            }
            Node::While(_) => "while loop".to_string(),
            Node::RepeatWhile(_) => "repeat-while loop".to_string(),
            Node::Do(_) => "do loop".to_string(),
            Node::For(_) => "for loop".to_string(),
            Node::FunctionPrototype(p) => format!("function prototype {}", signature_text(p)),
            Node::Function(f) => format!("function {}", signature_text(&f.prototype)),
            Node::Return(Some(_)) => "return with value".to_string(),
            Node::Return(None) => "return".to_string(),
            Node::Continue => "continue".to_string(),
            Node::Break => "break".to_string(),
            Node::Body(body) => format!("body of {} statements", body.nodes.len()),
        }
    }

    /// `a.b.c` for member chains, the plain name for variables
    fn member_path_text(&self) -> String {
        match self {
            Node::Variable(name) => name.clone(),
            Node::StructMember { variable, name } => {
                format!("{}.{}", variable.member_path_text(), name)
            }
            other => other.description(),
        }
    }

    /// Indented outline of the subtree, one node per line
    pub fn tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&self.description());
        out.push('\n');
        for child in self.child_nodes() {
            child.write_tree(out, depth + 1);
        }
    }
}

fn signature_text(prototype: &FunctionPrototype) -> String {
    let returns = if prototype.returns { " returns" } else { "" };
    format!(
        "{}({}){}",
        prototype.name,
        prototype.argument_names.join(", "),
        returns
    )
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}
