// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filter expressions seen by the pruning walker, and constant folding

use crate::search::Strategy;
use crate::value::Value;
use std::fmt;

/// Comparison operator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Operator class strategy; `Ne` has none and cannot prune
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            CmpOp::Eq => Some(Strategy::Equal),
            CmpOp::Ne => None,
            CmpOp::Lt => Some(Strategy::Less),
            CmpOp::Le => Some(Strategy::LessEqual),
            CmpOp::Gt => Some(Strategy::Greater),
            CmpOp::Ge => Some(Strategy::GreaterEqual),
        }
    }

    /// Operator for `b op' a` equivalent to `a op b`
    pub fn commute(self) -> Self {
        match self {
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Leaf of a comparison
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Column(String),
    Const(Value),
    /// Positional parameter, known only at execution time
    Param(usize),
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(name.into())
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Operand::Column(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(name) => f.write_str(name),
            Operand::Const(value @ Value::Date(_)) => write!(f, "'{value}'"),
            Operand::Const(value) => write!(f, "{value}"),
            Operand::Param(n) => write!(f, "${}", n + 1),
        }
    }
}

/// Filter expression tree
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    /// `column IN (...)`, i.e. `column = ANY(array)`
    InList {
        column: String,
        values: Vec<Operand>,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    /// Any node the walker does not understand
    Other(String),
}

impl Expr {
    /// `column op value`
    pub fn cmp(column: impl Into<String>, op: CmpOp, value: Value) -> Self {
        Expr::Compare {
            left: Operand::Column(column.into()),
            op,
            right: Operand::Const(value),
        }
    }

    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self::cmp(column, CmpOp::Eq, value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::And(args) => write_joined(f, args, " AND ", "TRUE"),
            Expr::Or(args) => write_joined(f, args, " OR ", "FALSE"),
            Expr::Not(inner) => write!(f, "NOT ({inner})"),
            Expr::Compare { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Expr::InList { column, values } => {
                write!(f, "{column} IN (")?;
                for (n, value) in values.iter().enumerate() {
                    if n > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Expr::IsNull { column, negated } => {
                let not = if *negated { " NOT" } else { "" };
                write!(f, "{column} IS{not} NULL")
            }
            Expr::Other(text) => f.write_str(text),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, args: &[Expr], sep: &str, empty: &str) -> fmt::Result {
    if args.is_empty() {
        return f.write_str(empty);
    }
    for (n, arg) in args.iter().enumerate() {
        if n > 0 {
            f.write_str(sep)?;
        }
        write!(f, "({arg})")?;
    }
    Ok(())
}

/// Constant folding service used while walking expressions
pub trait ConstEvaluator: Send + Sync {
    /// Resolve `operand` to a concrete value, if it does not depend on a row
    fn evaluate_constant(&self, operand: &Operand) -> Option<Value>;
}

/// Evaluator binding positional parameters of a prepared statement
#[derive(Clone, Debug, Default)]
pub struct ParamEvaluator {
    params: Vec<Value>,
}

impl ParamEvaluator {
    pub fn new(params: Vec<Value>) -> Self {
        Self { params }
    }
}

impl ConstEvaluator for ParamEvaluator {
    fn evaluate_constant(&self, operand: &Operand) -> Option<Value> {
        match operand {
            Operand::Const(value) => Some(value.clone()),
            Operand::Param(n) => self.params.get(*n).cloned(),
            Operand::Column(_) => None,
        }
    }
}
