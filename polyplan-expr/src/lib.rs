//! Expression trees for the polyplan compiler.
//!
//! - [`logical`]: name-based [`Expr`] and [`Filter`] trees, the compiler's input
//! - [`physical`]: index-based [`ScalarExpr`] and [`PredicateExpr`] trees, its output
//! - [`normalization`]: `Not` elimination and cheap-first reordering of filters
//! - [`visitor`] and [`traversal`]: stack-safe walks and folds over both
#![forbid(unsafe_code)]

pub mod format;
pub mod logical;
pub mod normalization;
pub mod physical;
pub mod traversal;
pub mod visitor;

pub use logical::{ArithmeticOp, CaseWhenExpr, Expr, Filter, FunctionExpr, InOp, Op};
pub use normalization::{complexity, contains_not, push_not, reorder};
pub use physical::{
    LikePattern, PredicateExpr, PredicateFunction, ScalarExpr, ScalarFunction, TemporalUnit,
};
pub use visitor::{FilterVisitor, walk_filter};
