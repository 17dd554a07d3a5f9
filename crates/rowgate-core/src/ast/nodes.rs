//! AST node definitions

use std::fmt;

/// A checked condition expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal constant
    Const(Constant),

    /// Bare identifier (e.g., `record`)
    Ident(String),

    /// Member selection (e.g., `record.unit_id`)
    Select { operand: Box<Expr>, field: String },

    /// Operator or function application
    Call { function: Function, args: Vec<Expr> },

    /// List literal (e.g., `[1, 2]`)
    List(Vec<Expr>),
}

impl Expr {
    /// Create a constant expression
    pub fn constant(value: Constant) -> Self {
        Self::Const(value)
    }

    /// Create an identifier expression
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Ident(name.into())
    }

    /// Create a member selection
    pub fn select(operand: Expr, field: impl Into<String>) -> Self {
        Self::Select {
            operand: Box::new(operand),
            field: field.into(),
        }
    }

    /// Create a `base.field` selection on a named variable
    pub fn member(base: &str, field: &str) -> Self {
        Self::select(Self::ident(base), field)
    }

    /// Create an operator call
    pub fn call(op: Operator, args: Vec<Expr>) -> Self {
        Self::Call {
            function: Function::Operator(op),
            args,
        }
    }

    /// Create a binary operator call
    pub fn binary(left: Expr, op: Operator, right: Expr) -> Self {
        Self::call(op, vec![left, right])
    }
}

/// A literal constant
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Null,
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Bool(b) => write!(f, "{}", b),
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Double(n) => write!(f, "{}", n),
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Null => write!(f, "null"),
        }
    }
}

/// The callee of a [`Expr::Call`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Function {
    /// Built-in operator
    Operator(Operator),
    /// Global function by name (e.g., `size`)
    Named(String),
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Operator(op) => write!(f, "{}", op.function_name()),
            Function::Named(name) => write!(f, "{}", name),
        }
    }
}

/// Operators recognised by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // Relations
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,

    // Logical
    And,
    Or,
    Not,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,

    // Indexing (`a[b]`)
    Index,
}

impl Operator {
    /// Canonical function name, used in diagnostics
    pub fn function_name(&self) -> &'static str {
        match self {
            Operator::Eq => "_==_",
            Operator::Neq => "_!=_",
            Operator::Lt => "_<_",
            Operator::LtEq => "_<=_",
            Operator::Gt => "_>_",
            Operator::GtEq => "_>=_",
            Operator::In => "_in_",
            Operator::NotIn => "_not_in_",
            Operator::And => "_&&_",
            Operator::Or => "_||_",
            Operator::Not => "!_",
            Operator::Add => "_+_",
            Operator::Sub => "_-_",
            Operator::Mul => "_*_",
            Operator::Div => "_/_",
            Operator::Mod => "_%_",
            Operator::Negate => "-_",
            Operator::Index => "_[_]",
        }
    }

    /// Number of operands the operator takes
    pub fn arity(&self) -> usize {
        match self {
            Operator::Not | Operator::Negate => 1,
            _ => 2,
        }
    }

    /// SQL spelling for operators that lower to SQL, `None` otherwise
    pub fn sql(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Neq => Some("!="),
            Operator::Lt => Some("<"),
            Operator::LtEq => Some("<="),
            Operator::Gt => Some(">"),
            Operator::GtEq => Some(">="),
            Operator::And => Some("AND"),
            Operator::Or => Some("OR"),
            Operator::In => Some("IN"),
            Operator::NotIn => Some("NOT IN"),
            _ => None,
        }
    }

    /// Whether the operator is a membership test
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.function_name())
    }
}
