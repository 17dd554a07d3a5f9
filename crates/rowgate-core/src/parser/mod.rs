//! Condition language parser
//!
//! Expressions are parsed with `cel-parser` and lowered into the closed
//! [`Expr`](crate::ast::Expr) tree the checker and compiler work on.

mod convert;
pub mod parse;

pub use parse::{parse, parse_with_limits, ParseError, ParseLimits, ParseResult};
