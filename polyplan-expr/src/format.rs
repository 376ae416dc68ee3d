//! Display helpers for logical expressions and filters.
//!
//! `Expr`'s rendering doubles as its column name: it is the alias given to compiled
//! expressions and the literal name matched by function short-circuiting.

use std::fmt;

use crate::logical::{ArithmeticOp, Expr, Filter, InOp, Op};

impl ArithmeticOp {
    /// Render the operator as a human-readable symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOp::Plus => "+",
            ArithmeticOp::Minus => "-",
            ArithmeticOp::Star => "*",
            ArithmeticOp::Div => "/",
            ArithmeticOp::Mod => "%",
        }
    }
}

impl Op {
    /// Render the operator; "all" variants carry a leading `&`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "==",
            Op::NotEq => "!=",
            Op::Gt => ">",
            Op::GtEq => ">=",
            Op::Lt => "<",
            Op::LtEq => "<=",
            Op::Like => "like",
            Op::NotLike => "not like",
            Op::EqAll => "&==",
            Op::NotEqAll => "&!=",
            Op::GtAll => "&>",
            Op::GtEqAll => "&>=",
            Op::LtAll => "&<",
            Op::LtEqAll => "&<=",
            Op::LikeAll => "&like",
            Op::NotLikeAll => "&not like",
        }
    }
}

impl InOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            InOp::In => "in",
            InOp::NotIn => "not in",
            InOp::InAll => "&in",
            InOp::NotInAll => "&not in",
        }
    }
}

impl fmt::Display for ArithmeticOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for InOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Path(path) => f.write_str(path),
            Expr::Key => f.write_str(polyplan_types::KEY_COLUMN_NAME),
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Binary { op, left, right } => write!(f, "{left} {op} {right}"),
            Expr::Unary { op, operand } => write!(f, "{op}{operand}"),
            Expr::Bracket { inner, alias } => match alias {
                Some(alias) => f.write_str(alias),
                None => write!(f, "({inner})"),
            },
            Expr::CaseWhen(case) => {
                write!(f, "CASE")?;
                for (condition, result) in case.conditions.iter().zip(&case.results) {
                    write!(f, " WHEN {condition} THEN {result}")?;
                }
                if let Some(else_result) = &case.else_result {
                    write!(f, " ELSE {else_result}")?;
                }
                write!(f, " END")
            }
            Expr::Function(func) => {
                write!(f, "{}(", func.name)?;
                if func.distinct {
                    write!(f, "distinct ")?;
                }
                let mut first = true;
                for arg in &func.args {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                    first = false;
                }
                for value in &func.positional {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                    first = false;
                }
                for (key, value) in &func.named {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}={value}")?;
                    first = false;
                }
                write!(f, ")")
            }
            Expr::Multiple { children, ops } => {
                for (idx, child) in children.iter().enumerate() {
                    let op = ops.get(idx).copied().unwrap_or(ArithmeticOp::Plus);
                    match (idx, op) {
                        (0, ArithmeticOp::Plus) => write!(f, "{child}")?,
                        (0, op) => write!(f, "{op}{child}")?,
                        (_, op) => write!(f, " {op} {child}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Value { path, op, value } => write!(f, "{path} {op} {value}"),
            Filter::Path { path_a, op, path_b } => write!(f, "{path_a} {op} {path_b}"),
            Filter::Key { op, value } => {
                write!(f, "{} {op} {value}", polyplan_types::KEY_COLUMN_NAME)
            }
            Filter::Expr { left, op, right } => write!(f, "{left} {op} {right}"),
            Filter::In { path, op, values } => {
                write!(f, "{path} {op} (")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Filter::Bool(value) => write!(f, "{value}"),
            Filter::And(children) => write_connective(f, "&&", children, "true"),
            Filter::Or(children) => write_connective(f, "||", children, "false"),
            Filter::Not(child) => write!(f, "!({child})"),
        }
    }
}

fn write_connective(
    f: &mut fmt::Formatter<'_>,
    joiner: &str,
    children: &[Filter],
    empty: &str,
) -> fmt::Result {
    if children.is_empty() {
        return f.write_str(empty);
    }
    write!(f, "(")?;
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            write!(f, " {joiner} ")?;
        }
        write!(f, "{child}")?;
    }
    write!(f, ")")
}
