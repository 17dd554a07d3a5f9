//! Abstract Syntax Tree (AST) for condition expressions
//!
//! The AST represents a parsed condition before it is checked and lowered to SQL.

pub mod nodes;
pub mod types;
pub mod visitor;

pub use nodes::{Constant, Expr, Function, Operator};
pub use types::{check, CheckError, Type, TypeChecker, TypeEnv, RECORD_VAR, REQUEST_USER_VAR};
pub use visitor::{walk_expr, References, Visitor};
