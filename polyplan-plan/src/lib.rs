//! Physical planning for polyplan expressions and filters.
//!
//! Compilation turns name-based logical trees into index-based physical trees bound to
//! a concrete [`BatchSchema`](polyplan_types::BatchSchema):
//!
//! - [`resolver`]: matches dotted path patterns against field names
//! - [`expression`]: compiles [`Expr`](polyplan_expr::Expr) into
//!   [`ScalarExpr`](polyplan_expr::ScalarExpr)
//! - [`filter`]: normalizes and compiles [`Filter`](polyplan_expr::Filter) into
//!   [`PredicateExpr`](polyplan_expr::PredicateExpr)
//!
//! All compile calls share a [`CompileContext`] holding the literal pool, the function
//! catalog, and [`CompileOptions`]. Compilation is fail-fast: the first error aborts
//! the call.
#![forbid(unsafe_code)]

pub mod context;
pub mod expression;
pub mod filter;
pub mod resolver;

pub use context::{CompileContext, CompileOptions, LiteralPool};
pub use expression::compile_expression;
pub use filter::{and_predicates, compile_filter, normalize_filter, or_predicates};
pub use resolver::{
    expect_unique, match_exact_ignore_key, match_pattern, match_pattern_ignore_key, resolve_key,
    resolve_pattern, resolve_unique,
};
