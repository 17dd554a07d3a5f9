//! Visitor pattern for traversing expressions

use super::nodes::{Constant, Expr, Function};
use super::types::{RECORD_VAR, REQUEST_USER_VAR};
use serde::Serialize;
use std::collections::BTreeSet;

/// Visitor trait for expression traversal
pub trait Visitor: Sized {
    /// Visit an expression
    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }

    /// Visit a `base.field` selection whose base is a bare identifier
    fn visit_member(&mut self, _base: &str, _field: &str) {}

    /// Visit a call before its arguments
    fn visit_call(&mut self, _function: &Function, _args: &[Expr]) {}

    /// Visit a constant
    fn visit_constant(&mut self, _value: &Constant) {}
}

/// Walk an expression
pub fn walk_expr<V: Visitor>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Const(value) => visitor.visit_constant(value),

        Expr::Ident(_) => {}

        Expr::Select { operand, field } => {
            if let Expr::Ident(base) = operand.as_ref() {
                visitor.visit_member(base, field);
            } else {
                visitor.visit_expr(operand);
            }
        }

        Expr::Call { function, args } => {
            visitor.visit_call(function, args);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }

        Expr::List(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
    }
}

/// Record columns and `request_user` attributes an expression refers to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct References {
    pub columns: BTreeSet<String>,
    pub attributes: BTreeSet<String>,
}

impl References {
    /// Collect the references of an expression
    pub fn collect(expr: &Expr) -> Self {
        let mut refs = Self::default();
        refs.visit_expr(expr);
        refs
    }
}

impl Visitor for References {
    fn visit_member(&mut self, base: &str, field: &str) {
        match base {
            RECORD_VAR => {
                self.columns.insert(field.to_string());
            }
            REQUEST_USER_VAR => {
                self.attributes.insert(field.to_string());
            }
            _ => {}
        }
    }
}
