//! In-memory evaluation of condition expressions against a single record
//!
//! Mirrors what the compiled SQL predicate would do for the same row,
//! including three-valued logic: comparisons involving NULL are unknown, and
//! an unknown result does not select the row.

use crate::ast::nodes::{Constant, Expr, Function, Operator};
use crate::ast::types::{RECORD_VAR, REQUEST_USER_VAR};
use crate::context::{ContextValue, Record, RequestContext, SqlValue};
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("record has no column {0}")]
    MissingColumn(String),

    #[error("request_user.{0} not provided")]
    MissingAttribute(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("right side of `in`/`not in` must be a list")]
    InRequiresList,

    #[error("unsupported expression: {0}")]
    Unsupported(String),
}

pub type EvalResult<T> = Result<T, EvalError>;

/// Intermediate value during evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Scalar(SqlValue),
    List(Vec<SqlValue>),
}

impl Value {
    /// Three-valued truth: `None` is SQL unknown
    fn truth(&self) -> EvalResult<Option<bool>> {
        match self {
            Value::Null => Ok(None),
            Value::Scalar(SqlValue::Bool(b)) => Ok(Some(*b)),
            other => Err(EvalError::TypeMismatch(format!("expected bool, got {:?}", other))),
        }
    }

    fn from_truth(truth: Option<bool>) -> Self {
        match truth {
            Some(b) => Value::Scalar(SqlValue::Bool(b)),
            None => Value::Null,
        }
    }
}

/// Evaluator bound to one record and request context
pub struct Interpreter<'a> {
    record: &'a Record,
    context: &'a RequestContext,
}

impl<'a> Interpreter<'a> {
    pub fn new(record: &'a Record, context: &'a RequestContext) -> Self {
        Self { record, context }
    }

    /// Evaluate a condition; `Some(true)` means the record is selected
    pub fn evaluate(&self, expr: &Expr) -> EvalResult<Option<bool>> {
        self.eval(expr)?.truth()
    }

    fn eval(&self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Const(constant) => Ok(match constant {
                Constant::Bool(b) => Value::Scalar(SqlValue::Bool(*b)),
                Constant::Int(n) => Value::Scalar(SqlValue::Int(*n)),
                Constant::Double(n) => Value::Scalar(SqlValue::Float(*n)),
                Constant::String(s) => Value::Scalar(SqlValue::String(s.clone())),
                Constant::Null => Value::Null,
            }),

            Expr::Ident(name) => match name.as_str() {
                "true" => Ok(Value::Scalar(SqlValue::Bool(true))),
                "false" => Ok(Value::Scalar(SqlValue::Bool(false))),
                _ => Err(EvalError::Unsupported(format!("identifier {}", name))),
            },

            Expr::Select { operand, field } => self.eval_select(operand, field),

            Expr::Call { function, args } => self.eval_call(function, args),

            Expr::List(_) => Err(EvalError::Unsupported("list literal".to_string())),
        }
    }

    fn eval_select(&self, operand: &Expr, field: &str) -> EvalResult<Value> {
        let base = match operand {
            Expr::Ident(base) => base.as_str(),
            _ => return Err(EvalError::Unsupported("nested selection".to_string())),
        };

        match base {
            RECORD_VAR => match self.record.get(field) {
                Some(Some(value)) => Ok(Value::Scalar(value.clone())),
                Some(None) => Ok(Value::Null),
                None => Err(EvalError::MissingColumn(field.to_string())),
            },
            REQUEST_USER_VAR => match self.context.get(field) {
                Some(ContextValue::Scalar(value)) => Ok(Value::Scalar(value.clone())),
                Some(ContextValue::List(values)) => Ok(Value::List(values.clone())),
                None => Err(EvalError::MissingAttribute(field.to_string())),
            },
            other => Err(EvalError::Unsupported(format!("select base {}", other))),
        }
    }

    fn eval_call(&self, function: &Function, args: &[Expr]) -> EvalResult<Value> {
        let op = match function {
            Function::Operator(op) if op.sql().is_some() && args.len() == 2 => *op,
            _ => return Err(EvalError::Unsupported(format!("function {}", function))),
        };

        let left = self.eval(&args[0])?;
        let right = self.eval(&args[1])?;

        let truth = match op {
            Operator::And => and(left.truth()?, right.truth()?),
            Operator::Or => or(left.truth()?, right.truth()?),
            Operator::In => membership(&left, &right)?,
            Operator::NotIn => membership(&left, &right)?.map(|found| !found),
            _ => compare(op, &left, &right)?,
        };

        Ok(Value::from_truth(truth))
    }
}

fn and(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

fn or(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Some(true),
        (Some(false), Some(false)) => Some(false),
        _ => None,
    }
}

fn membership(left: &Value, right: &Value) -> EvalResult<Option<bool>> {
    let values = match right {
        Value::List(values) if !values.is_empty() => values,
        _ => return Err(EvalError::InRequiresList),
    };
    let needle = match left {
        Value::Null => return Ok(None),
        Value::Scalar(value) => value,
        Value::List(_) => return Err(EvalError::TypeMismatch("list on left of `in`".to_string())),
    };

    for value in values {
        if order(needle, value)? == Ordering::Equal {
            return Ok(Some(true));
        }
    }
    Ok(Some(false))
}

fn compare(op: Operator, left: &Value, right: &Value) -> EvalResult<Option<bool>> {
    let (a, b) = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(None),
        (Value::Scalar(a), Value::Scalar(b)) => (a, b),
        _ => return Err(EvalError::TypeMismatch("list in comparison".to_string())),
    };

    let ordering = order(a, b)?;
    let result = match op {
        Operator::Eq => ordering == Ordering::Equal,
        Operator::Neq => ordering != Ordering::Equal,
        Operator::Lt => ordering == Ordering::Less,
        Operator::LtEq => ordering != Ordering::Greater,
        Operator::Gt => ordering == Ordering::Greater,
        Operator::GtEq => ordering != Ordering::Less,
        other => return Err(EvalError::Unsupported(format!("operator {}", other))),
    };
    Ok(Some(result))
}

fn order(a: &SqlValue, b: &SqlValue) -> EvalResult<Ordering> {
    let mismatch = || EvalError::TypeMismatch(format!("cannot compare {} with {}", a, b));
    match (a, b) {
        (SqlValue::Int(x), SqlValue::Int(y)) => Ok(x.cmp(y)),
        (SqlValue::Int(x), SqlValue::Float(y)) => (*x as f64).partial_cmp(y).ok_or_else(mismatch),
        (SqlValue::Float(x), SqlValue::Int(y)) => x.partial_cmp(&(*y as f64)).ok_or_else(mismatch),
        (SqlValue::Float(x), SqlValue::Float(y)) => x.partial_cmp(y).ok_or_else(mismatch),
        (SqlValue::String(x), SqlValue::String(y)) => Ok(x.cmp(y)),
        (SqlValue::Bool(x), SqlValue::Bool(y)) => Ok(x.cmp(y)),
        _ => Err(mismatch()),
    }
}

/// Evaluate a checked expression against one record
pub fn evaluate(
    expr: &Expr,
    record: &Record,
    context: &RequestContext,
) -> EvalResult<Option<bool>> {
    Interpreter::new(record, context).evaluate(expr)
}
