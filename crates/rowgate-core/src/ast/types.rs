//! Type checking for condition expressions
//!
//! The checker runs between parsing and compilation. It resolves identifiers
//! against the declared variables (`record` and `request_user`, both maps of
//! string to dynamic values) and rejects operator applications whose operand
//! types are statically known to be incompatible. Anything typed `Dyn` passes
//! and is left to the compiler.

use super::nodes::{Constant, Expr, Function, Operator};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Variable bound to the row under evaluation
pub const RECORD_VAR: &str = "record";

/// Variable bound to the requesting principal's attributes
pub const REQUEST_USER_VAR: &str = "request_user";

/// Type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Bool,
    Int,
    Double,
    String,
    Null,
    List,
    Map,
    Dyn,
}

impl Type {
    /// Check if two operand types may be compared
    pub fn is_comparable_with(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Dyn, _) | (_, Type::Dyn) => true,
            (Type::Null, _) | (_, Type::Null) => true,
            (Type::Int, Type::Double) | (Type::Double, Type::Int) => true,
            (a, b) => a == b,
        }
    }

    /// Check if a value of this type may be used as a boolean
    pub fn is_boolish(&self) -> bool {
        matches!(self, Type::Bool | Type::Dyn)
    }

    /// Check if this type supports `.field` selection
    pub fn is_selectable(&self) -> bool {
        matches!(self, Type::Map | Type::Dyn)
    }

    /// Get type from constant
    pub fn from_constant(value: &Constant) -> Self {
        match value {
            Constant::Bool(_) => Type::Bool,
            Constant::Int(_) => Type::Int,
            Constant::Double(_) => Type::Double,
            Constant::String(_) => Type::String,
            Constant::Null => Type::Null,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Double => "double",
            Type::String => "string",
            Type::Null => "null_type",
            Type::List => "list(dyn)",
            Type::Map => "map(string, dyn)",
            Type::Dyn => "dyn",
        };
        write!(f, "{}", name)
    }
}

/// Type environment for type checking
#[derive(Debug, Clone)]
pub struct TypeEnv {
    variables: HashMap<String, Type>,
}

impl TypeEnv {
    /// Create a new type environment
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Add a variable binding
    pub fn bind(&mut self, name: impl Into<String>, typ: Type) {
        self.variables.insert(name.into(), typ);
    }

    /// Look up a variable type
    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    /// Standard environment: `record` and `request_user`
    pub fn standard() -> Self {
        let mut env = Self::new();
        env.bind(RECORD_VAR, Type::Map);
        env.bind(REQUEST_USER_VAR, Type::Map);
        env
    }
}

impl Default for TypeEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Type checker for expressions
pub struct TypeChecker {
    env: TypeEnv,
    errors: Vec<CheckError>,
}

impl TypeChecker {
    /// Create a new type checker
    pub fn new(env: TypeEnv) -> Self {
        Self {
            env,
            errors: Vec::new(),
        }
    }

    /// Check an expression, returning its type or the first error found
    pub fn check(mut self, expr: &Expr) -> Result<Type, CheckError> {
        let typ = self.check_expression(expr);
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(typ),
        }
    }

    /// Check the type of an expression, collecting errors
    pub fn check_expression(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Const(value) => Type::from_constant(value),

            Expr::Ident(name) => match self.env.lookup(name) {
                Some(typ) => typ.clone(),
                None => {
                    self.errors.push(CheckError::UndeclaredReference(name.clone()));
                    Type::Dyn
                }
            },

            Expr::Select { operand, field } => {
                let base = self.check_expression(operand);
                if !base.is_selectable() {
                    self.errors.push(CheckError::InvalidFieldAccess {
                        base,
                        field: field.clone(),
                    });
                }
                Type::Dyn
            }

            Expr::List(items) => {
                for item in items {
                    self.check_expression(item);
                }
                Type::List
            }

            Expr::Call { function, args } => {
                let arg_types: Vec<Type> =
                    args.iter().map(|arg| self.check_expression(arg)).collect();
                match function {
                    Function::Operator(op) => self.check_operator(*op, &arg_types),
                    Function::Named(name) => {
                        self.errors.push(CheckError::UndeclaredReference(name.clone()));
                        Type::Dyn
                    }
                }
            }
        }
    }

    fn check_operator(&mut self, op: Operator, args: &[Type]) -> Type {
        if args.len() != op.arity() {
            self.errors.push(CheckError::WrongArity {
                function: op.function_name().to_string(),
                expected: op.arity(),
                got: args.len(),
            });
            return Type::Dyn;
        }

        match op {
            Operator::And | Operator::Or | Operator::Not => {
                for typ in args {
                    if !typ.is_boolish() {
                        self.errors.push(CheckError::ExpectedBool {
                            function: op.function_name().to_string(),
                            got: typ.clone(),
                        });
                    }
                }
                Type::Bool
            }

            Operator::Eq
            | Operator::Neq
            | Operator::Lt
            | Operator::LtEq
            | Operator::Gt
            | Operator::GtEq => {
                if !args[0].is_comparable_with(&args[1]) {
                    self.no_overload(op, args);
                }
                Type::Bool
            }

            Operator::In | Operator::NotIn => {
                if !matches!(args[1], Type::List | Type::Map | Type::Dyn) {
                    self.no_overload(op, args);
                }
                Type::Bool
            }

            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div | Operator::Mod => {
                let numeric = |t: &Type| matches!(t, Type::Int | Type::Double | Type::Dyn);
                let concat = op == Operator::Add
                    && args.iter().all(|t| matches!(t, Type::String | Type::Dyn));
                if !(args.iter().all(numeric) || concat) {
                    self.no_overload(op, args);
                }
                Type::Dyn
            }

            Operator::Negate => {
                if !matches!(args[0], Type::Int | Type::Double | Type::Dyn) {
                    self.no_overload(op, args);
                }
                args[0].clone()
            }

            Operator::Index => {
                if !matches!(args[0], Type::List | Type::Map | Type::Dyn) {
                    self.no_overload(op, args);
                }
                Type::Dyn
            }
        }
    }

    fn no_overload(&mut self, op: Operator, args: &[Type]) {
        self.errors.push(CheckError::NoMatchingOverload {
            function: op.function_name().to_string(),
            args: args.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", "),
        });
    }

    /// Get collected errors
    pub fn errors(&self) -> &[CheckError] {
        &self.errors
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Check an expression against the standard environment
pub fn check(expr: &Expr) -> Result<Type, CheckError> {
    TypeChecker::new(TypeEnv::standard()).check(expr)
}

/// Type checking errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    #[error("undeclared reference to '{0}'")]
    UndeclaredReference(String),

    #[error("type '{base}' does not support field selection (field '{field}')")]
    InvalidFieldAccess { base: Type, field: String },

    #[error("found no matching overload for '{function}' applied to ({args})")]
    NoMatchingOverload { function: String, args: String },

    #[error("'{function}' expects bool operands, got '{got}'")]
    ExpectedBool { function: String, got: Type },

    #[error("'{function}' expects {expected} argument(s), got {got}")]
    WrongArity {
        function: String,
        expected: usize,
        got: usize,
    },
}
