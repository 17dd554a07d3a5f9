//! Lowering from the `cel-parser` tree to [`Expr`]

use super::parse::{ParseError, ParseResult};
use crate::ast::nodes::{Constant, Expr, Function, Operator};
use cel_parser::{ArithmeticOp, Atom, Expression, Member, RelationOp, UnaryOp};

pub(super) struct Converter {
    max_depth: usize,
}

impl Converter {
    pub(super) fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub(super) fn convert(&self, expr: &Expression) -> ParseResult<Expr> {
        self.lower(expr, 1)
    }

    fn lower(&self, expr: &Expression, depth: usize) -> ParseResult<Expr> {
        if depth > self.max_depth {
            return Err(ParseError::TooDeep {
                max: self.max_depth,
            });
        }
        let next = depth + 1;

        match expr {
            Expression::Or(left, right) => self.binary(left, Operator::Or, right, next),
            Expression::And(left, right) => self.binary(left, Operator::And, right, next),
            // `a in !b` is how the `not in` spelling reaches the grammar
            Expression::Relation(left, RelationOp::In, right) => match right.as_ref() {
                Expression::Unary(UnaryOp::Not, list) => {
                    self.binary(left, Operator::NotIn, list, next)
                }
                _ => self.binary(left, Operator::In, right, next),
            },
            Expression::Relation(left, op, right) => {
                self.binary(left, relation_operator(op), right, next)
            }
            Expression::Arithmetic(left, op, right) => {
                self.binary(left, arithmetic_operator(op), right, next)
            }
            Expression::Unary(op, operand) => self.unary(op, operand, next),
            Expression::Member(operand, member) => match member.as_ref() {
                Member::Attribute(field) => {
                    Ok(Expr::select(self.lower(operand, next)?, field.as_str()))
                }
                Member::Index(index) => Ok(Expr::binary(
                    self.lower(operand, next)?,
                    Operator::Index,
                    self.lower(index, next)?,
                )),
                _ => Err(unsupported("message construction")),
            },
            Expression::FunctionCall(function, target, args) => {
                if target.is_some() {
                    return Err(unsupported("method call"));
                }
                let name = match function.as_ref() {
                    Expression::Ident(name) => name.to_string(),
                    _ => return Err(unsupported("computed function name")),
                };
                Ok(Expr::Call {
                    function: Function::Named(name),
                    args: self.lower_all(args, next)?,
                })
            }
            Expression::List(items) => Ok(Expr::List(self.lower_all(items, next)?)),
            Expression::Atom(atom) => Ok(Expr::constant(constant(atom)?)),
            Expression::Ident(name) => Ok(Expr::ident(name.as_str())),
            _ => Err(unsupported("conditional or map expression")),
        }
    }

    fn binary(
        &self,
        left: &Expression,
        op: Operator,
        right: &Expression,
        depth: usize,
    ) -> ParseResult<Expr> {
        Ok(Expr::binary(
            self.lower(left, depth)?,
            op,
            self.lower(right, depth)?,
        ))
    }

    fn lower_all(&self, items: &[Expression], depth: usize) -> ParseResult<Vec<Expr>> {
        items.iter().map(|item| self.lower(item, depth)).collect()
    }

    fn unary(&self, op: &UnaryOp, operand: &Expression, depth: usize) -> ParseResult<Expr> {
        match op {
            UnaryOp::Not => Ok(Expr::call(Operator::Not, vec![self.lower(operand, depth)?])),
            UnaryOp::DoubleNot => {
                let inner = Expr::call(Operator::Not, vec![self.lower(operand, depth + 1)?]);
                Ok(Expr::call(Operator::Not, vec![inner]))
            }
            // Negative literals fold into the constant
            UnaryOp::Minus => match operand {
                Expression::Atom(Atom::Int(value)) => value
                    .checked_neg()
                    .map(|v| Expr::constant(Constant::Int(v)))
                    .ok_or_else(|| unsupported("integer literal out of range")),
                Expression::Atom(Atom::Float(value)) => {
                    Ok(Expr::constant(Constant::Double(-value)))
                }
                _ => Ok(Expr::call(Operator::Negate, vec![self.lower(operand, depth)?])),
            },
            UnaryOp::DoubleMinus => {
                let inner = Expr::call(Operator::Negate, vec![self.lower(operand, depth + 1)?]);
                Ok(Expr::call(Operator::Negate, vec![inner]))
            }
        }
    }
}

fn relation_operator(op: &RelationOp) -> Operator {
    match op {
        RelationOp::Equals => Operator::Eq,
        RelationOp::NotEquals => Operator::Neq,
        RelationOp::LessThan => Operator::Lt,
        RelationOp::LessThanEq => Operator::LtEq,
        RelationOp::GreaterThan => Operator::Gt,
        RelationOp::GreaterThanEq => Operator::GtEq,
        RelationOp::In => Operator::In,
    }
}

fn arithmetic_operator(op: &ArithmeticOp) -> Operator {
    match op {
        ArithmeticOp::Add => Operator::Add,
        ArithmeticOp::Subtract => Operator::Sub,
        ArithmeticOp::Multiply => Operator::Mul,
        ArithmeticOp::Divide => Operator::Div,
        ArithmeticOp::Modulus => Operator::Mod,
    }
}

fn constant(atom: &Atom) -> ParseResult<Constant> {
    match atom {
        Atom::Bool(value) => Ok(Constant::Bool(*value)),
        Atom::Int(value) => Ok(Constant::Int(*value)),
        Atom::UInt(value) => i64::try_from(*value)
            .map(Constant::Int)
            .map_err(|_| unsupported("unsigned literal out of range")),
        Atom::Float(value) => Ok(Constant::Double(*value)),
        Atom::String(value) => Ok(Constant::String(value.to_string())),
        Atom::Null => Ok(Constant::Null),
        _ => Err(unsupported("bytes literal")),
    }
}

fn unsupported(what: &str) -> ParseError {
    ParseError::Unsupported(what.to_string())
}
