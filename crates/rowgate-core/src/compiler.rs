//! Lowering of checked condition expressions to parameterized SQL
//!
//! Every literal and every `request_user` value becomes a `?` placeholder with
//! its value appended to the fragment's argument list, left to right. Only
//! `record.<column>` references and fixed keywords (`1=1`, `1=0`, `NULL`,
//! operators) ever appear in the SQL text.

use crate::ast::nodes::{Constant, Expr, Function};
use crate::ast::types::{self, CheckError, RECORD_VAR, REQUEST_USER_VAR};
use crate::context::{ContextValue, RequestContext, SqlValue};
use crate::parser::{self, ParseError, ParseLimits};
use serde::Serialize;
use thiserror::Error;

/// Unconditionally true predicate
pub const TRUE_PREDICATE: &str = "1=1";

/// Unconditionally false predicate
pub const FALSE_PREDICATE: &str = "1=0";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("unsupported identifier: {0}")]
    UnsupportedIdentifier(String),

    #[error("unsupported select operand")]
    UnsupportedSelectOperand,

    #[error("unsupported select base: {0}")]
    UnsupportedSelectBase(String),

    #[error("request_user.{0} not provided")]
    MissingAttribute(String),

    #[error("only binary operators are supported")]
    NotBinary,

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("right side of `in`/`not in` must be a list")]
    InRequiresList,

    #[error("left side of `in`/`not in` must not bind parameters")]
    InLeftBindsParameters,

    #[error("list values are only allowed on the right side of `in`/`not in`")]
    UnexpectedList,

    #[error("unsupported expression type: {0}")]
    UnsupportedExpression(String),

    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),
}

pub type CompileResult<T> = Result<T, CompileError>;

/// Any failure turning condition text into SQL
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("check error: {0}")]
    Check(#[from] CheckError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),
}

/// Whether a fragment stands for one value or a run of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    #[default]
    Scalar,
    List,
}

/// A SQL boolean (or value) fragment with its bound parameters
///
/// The number of `?` placeholders in `sql` always equals `args.len()`, and
/// placeholders appear left to right in the order of `args`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fragment {
    pub sql: String,
    pub args: Vec<SqlValue>,
    #[serde(skip)]
    shape: Shape,
}

impl Fragment {
    /// Literal SQL text with no parameters
    pub fn text(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
            shape: Shape::Scalar,
        }
    }

    /// A single bound parameter
    pub fn param(value: SqlValue) -> Self {
        Self {
            sql: "?".to_string(),
            args: vec![value],
            shape: Shape::Scalar,
        }
    }

    /// One placeholder per value, comma separated
    pub fn list(values: Vec<SqlValue>) -> Self {
        Self {
            sql: placeholders(values.len()),
            args: values,
            shape: Shape::List,
        }
    }

    fn group(sql: String, args: Vec<SqlValue>) -> Self {
        Self {
            sql,
            args,
            shape: Shape::Scalar,
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of `?` placeholders in the SQL text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Check a caller-supplied table or view name (`table` or `schema.table`)
pub fn validate_table_name(table_name: &str) -> CompileResult<()> {
    if table_name.split('.').all(is_sql_identifier) {
        Ok(())
    } else {
        Err(CompileError::InvalidIdentifier(table_name.to_string()))
    }
}

/// Compiles one checked expression against a table and request context
pub struct SqlCompiler<'a> {
    table_name: &'a str,
    context: &'a RequestContext,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(table_name: &'a str, context: &'a RequestContext) -> Self {
        Self {
            table_name,
            context,
        }
    }

    /// Lower an expression to a fragment
    pub fn compile(&self, expr: &Expr) -> CompileResult<Fragment> {
        match expr {
            Expr::Const(value) => Ok(Self::compile_constant(value)),

            Expr::Ident(name) => match name.as_str() {
                "true" => Ok(Fragment::text(TRUE_PREDICATE)),
                "false" => Ok(Fragment::text(FALSE_PREDICATE)),
                _ => Err(CompileError::UnsupportedIdentifier(name.clone())),
            },

            Expr::Select { operand, field } => self.compile_select(operand, field),

            Expr::Call { function, args } => self.compile_call(function, args),

            Expr::List(_) => Err(CompileError::UnsupportedExpression("list literal".to_string())),
        }
    }

    fn compile_constant(value: &Constant) -> Fragment {
        match value {
            Constant::Bool(true) => Fragment::text(TRUE_PREDICATE),
            Constant::Bool(false) => Fragment::text(FALSE_PREDICATE),
            Constant::Int(n) => Fragment::param(SqlValue::Int(*n)),
            Constant::Double(n) => Fragment::param(SqlValue::Float(*n)),
            Constant::String(s) => Fragment::param(SqlValue::String(s.clone())),
            // Never bound: drivers disagree on comparisons against a NULL parameter
            Constant::Null => Fragment::text("NULL"),
        }
    }

    fn compile_select(&self, operand: &Expr, field: &str) -> CompileResult<Fragment> {
        let base = match operand {
            Expr::Ident(base) => base.as_str(),
            _ => return Err(CompileError::UnsupportedSelectOperand),
        };

        match base {
            RECORD_VAR => {
                validate_table_name(self.table_name)?;
                if !is_sql_identifier(field) {
                    return Err(CompileError::InvalidIdentifier(field.to_string()));
                }
                Ok(Fragment::text(format!("{}.{}", self.table_name, field)))
            }

            REQUEST_USER_VAR => match self.context.get(field) {
                Some(ContextValue::Scalar(value)) => Ok(Fragment::param(value.clone())),
                Some(ContextValue::List(values)) => Ok(Fragment::list(values.clone())),
                None => Err(CompileError::MissingAttribute(field.to_string())),
            },

            other => Err(CompileError::UnsupportedSelectBase(other.to_string())),
        }
    }

    fn compile_call(&self, function: &Function, args: &[Expr]) -> CompileResult<Fragment> {
        if args.len() != 2 {
            return Err(CompileError::NotBinary);
        }

        let left = self.compile(&args[0])?;
        let right = self.compile(&args[1])?;

        let (op, sql_op) = match function {
            Function::Operator(op) => match op.sql() {
                Some(sql_op) => (*op, sql_op),
                None => return Err(CompileError::UnsupportedOperator(function.to_string())),
            },
            Function::Named(_) => {
                return Err(CompileError::UnsupportedOperator(function.to_string()));
            }
        };

        if op.is_membership() {
            return Self::compile_membership(left, sql_op, right);
        }

        if left.shape == Shape::List || right.shape == Shape::List {
            return Err(CompileError::UnexpectedList);
        }

        let sql = format!("({} {} {})", left.sql, sql_op, right.sql);
        let mut args = left.args;
        args.extend(right.args);
        Ok(Fragment::group(sql, args))
    }

    /// `record.field in request_user.list_field` is the supported form
    fn compile_membership(
        left: Fragment,
        sql_op: &str,
        right: Fragment,
    ) -> CompileResult<Fragment> {
        if right.shape != Shape::List || right.args.is_empty() {
            return Err(CompileError::InRequiresList);
        }
        if left.shape == Shape::List || !left.args.is_empty() {
            return Err(CompileError::InLeftBindsParameters);
        }

        let sql = format!("({} {} ({}))", left.sql, sql_op, placeholders(right.args.len()));
        Ok(Fragment::group(sql, right.args))
    }
}

/// Compile a checked expression
pub fn compile_expression(
    expr: &Expr,
    table_name: &str,
    context: &RequestContext,
) -> CompileResult<Fragment> {
    SqlCompiler::new(table_name, context).compile(expr)
}

/// Parse and type-check condition text
pub fn prepare(source: &str, limits: ParseLimits) -> Result<Expr, ExpressionError> {
    let expr = parser::parse_with_limits(source, limits)?;
    types::check(&expr)?;
    Ok(expr)
}

/// Parse, check and compile condition text in one step
pub fn compile_source(
    source: &str,
    table_name: &str,
    context: &RequestContext,
    limits: ParseLimits,
) -> Result<Fragment, ExpressionError> {
    let expr = prepare(source, limits)?;
    Ok(compile_expression(&expr, table_name, context)?)
}
