//! Name-based logical expression and filter trees.
//!
//! These are the inputs of the compiler. Columns are referenced by dotted path
//! patterns (`a.b`, `a.*`); nothing here is bound to a schema yet.

use std::collections::BTreeMap;

use polyplan_types::Value;

/// Arithmetic operator of `Binary`, `Unary`, and `Multiple` expressions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
    Plus,
    Minus,
    Star,
    Div,
    Mod,
}

/// Comparison operator of a filter leaf.
///
/// The plain variants have "any" semantics when a path fans out to several fields:
/// the leaf holds if some match satisfies it. The `*All` variants require every match
/// to satisfy it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Like,
    NotLike,
    EqAll,
    NotEqAll,
    GtAll,
    GtEqAll,
    LtAll,
    LtEqAll,
    LikeAll,
    NotLikeAll,
}

impl Op {
    /// Whether fanned-out comparisons combine with OR.
    pub fn is_or_op(&self) -> bool {
        matches!(
            self,
            Op::Eq | Op::NotEq | Op::Gt | Op::GtEq | Op::Lt | Op::LtEq | Op::Like | Op::NotLike
        )
    }

    /// Whether fanned-out comparisons combine with AND.
    pub fn is_and_op(&self) -> bool {
        !self.is_or_op()
    }

    /// The operator equivalent to `NOT (path op value)`.
    ///
    /// Negation flips both the comparison and the fan-out quantifier: "some match
    /// equals" negates to "every match differs".
    pub fn opposite(&self) -> Op {
        match self {
            Op::Eq => Op::NotEqAll,
            Op::NotEq => Op::EqAll,
            Op::Gt => Op::LtEqAll,
            Op::GtEq => Op::LtAll,
            Op::Lt => Op::GtEqAll,
            Op::LtEq => Op::GtAll,
            Op::Like => Op::NotLikeAll,
            Op::NotLike => Op::LikeAll,
            Op::EqAll => Op::NotEq,
            Op::NotEqAll => Op::Eq,
            Op::GtAll => Op::LtEq,
            Op::GtEqAll => Op::Lt,
            Op::LtAll => Op::GtEq,
            Op::LtEqAll => Op::Gt,
            Op::LikeAll => Op::NotLike,
            Op::NotLikeAll => Op::Like,
        }
    }

    /// The same comparison with "any" semantics.
    pub fn base(&self) -> Op {
        match self {
            Op::EqAll => Op::Eq,
            Op::NotEqAll => Op::NotEq,
            Op::GtAll => Op::Gt,
            Op::GtEqAll => Op::GtEq,
            Op::LtAll => Op::Lt,
            Op::LtEqAll => Op::LtEq,
            Op::LikeAll => Op::Like,
            Op::NotLikeAll => Op::NotLike,
            other => *other,
        }
    }

    pub fn is_equality(&self) -> bool {
        self.base() == Op::Eq
    }

    pub fn is_like(&self) -> bool {
        matches!(self.base(), Op::Like | Op::NotLike)
    }
}

/// Set-membership operator of an `In` filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InOp {
    In,
    NotIn,
    InAll,
    NotInAll,
}

impl InOp {
    pub fn is_or_op(&self) -> bool {
        matches!(self, InOp::In | InOp::NotIn)
    }

    pub fn is_not_op(&self) -> bool {
        matches!(self, InOp::NotIn | InOp::NotInAll)
    }

    pub fn opposite(&self) -> InOp {
        match self {
            InOp::In => InOp::NotInAll,
            InOp::NotIn => InOp::InAll,
            InOp::InAll => InOp::NotIn,
            InOp::NotInAll => InOp::In,
        }
    }
}

/// Function call node of a logical expression.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub positional: Vec<Value>,
    pub named: BTreeMap<String, Value>,
    pub distinct: bool,
}

impl FunctionExpr {
    pub fn new(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            name: name.into(),
            args,
            positional: Vec::new(),
            named: BTreeMap::new(),
            distinct: false,
        }
    }

    pub fn with_positional(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn with_named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(key.into(), value.into());
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

/// `CASE WHEN c1 THEN r1 ... [ELSE e] END`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaseWhenExpr {
    pub conditions: Vec<Filter>,
    pub results: Vec<Expr>,
    pub else_result: Option<Box<Expr>>,
}

/// Logical value expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Path(String),
    Key,
    Constant(Value),
    Binary {
        op: ArithmeticOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: ArithmeticOp,
        operand: Box<Expr>,
    },
    Bracket {
        inner: Box<Expr>,
        alias: Option<String>,
    },
    CaseWhen(CaseWhenExpr),
    Function(FunctionExpr),
    /// Flattened chain of `+`/`-` terms. `ops[0]` is the sign of `children[0]`.
    Multiple {
        children: Vec<Expr>,
        ops: Vec<ArithmeticOp>,
    },
}

impl Expr {
    #[inline]
    pub fn path(path: impl Into<String>) -> Expr {
        Expr::Path(path.into())
    }

    #[inline]
    pub fn constant(value: impl Into<Value>) -> Expr {
        Expr::Constant(value.into())
    }

    #[inline]
    pub fn binary(left: Expr, op: ArithmeticOp, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[inline]
    pub fn unary(op: ArithmeticOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    #[inline]
    pub fn bracket(inner: Expr, alias: Option<String>) -> Expr {
        Expr::Bracket {
            inner: Box::new(inner),
            alias,
        }
    }

    #[inline]
    pub fn function(function: FunctionExpr) -> Expr {
        Expr::Function(function)
    }

    #[inline]
    pub fn multiple(children: Vec<Expr>, ops: Vec<ArithmeticOp>) -> Expr {
        Expr::Multiple { children, ops }
    }

    #[inline]
    pub fn case_when(
        conditions: Vec<Filter>,
        results: Vec<Expr>,
        else_result: Option<Expr>,
    ) -> Expr {
        Expr::CaseWhen(CaseWhenExpr {
            conditions,
            results,
            else_result: else_result.map(Box::new),
        })
    }

    /// Canonical display string of this expression, used for output aliases.
    pub fn column_name(&self) -> String {
        self.to_string()
    }
}

/// Logical boolean filter.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Value {
        path: String,
        op: Op,
        value: Value,
    },
    Path {
        path_a: String,
        op: Op,
        path_b: String,
    },
    Key {
        op: Op,
        value: i64,
    },
    Expr {
        left: Box<Expr>,
        op: Op,
        right: Box<Expr>,
    },
    In {
        path: String,
        op: InOp,
        values: Vec<Value>,
    },
    Bool(bool),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    #[inline]
    pub fn value(path: impl Into<String>, op: Op, value: impl Into<Value>) -> Filter {
        Filter::Value {
            path: path.into(),
            op,
            value: value.into(),
        }
    }

    #[inline]
    pub fn paths(path_a: impl Into<String>, op: Op, path_b: impl Into<String>) -> Filter {
        Filter::Path {
            path_a: path_a.into(),
            op,
            path_b: path_b.into(),
        }
    }

    #[inline]
    pub fn key(op: Op, value: i64) -> Filter {
        Filter::Key { op, value }
    }

    #[inline]
    pub fn expr(left: Expr, op: Op, right: Expr) -> Filter {
        Filter::Expr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[inline]
    pub fn is_in(path: impl Into<String>, op: InOp, values: Vec<Value>) -> Filter {
        Filter::In {
            path: path.into(),
            op,
            values,
        }
    }

    #[inline]
    pub fn all_of(filters: Vec<Filter>) -> Filter {
        Filter::And(filters)
    }

    #[inline]
    pub fn any_of(filters: Vec<Filter>) -> Filter {
        Filter::Or(filters)
    }

    #[allow(clippy::should_implement_trait)]
    #[inline]
    pub fn not(filter: Filter) -> Filter {
        Filter::Not(Box::new(filter))
    }

    /// Whether this node is a leaf (not `And`, `Or`, or `Not`).
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Filter::And(_) | Filter::Or(_) | Filter::Not(_))
    }
}
