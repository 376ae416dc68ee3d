//! polyplan: a physical planning compiler for columnar query fragments.
//!
//! This crate is the entrypoint of the polyplan workspace. It re-exports the four
//! compiler entry calls and the types they consume and produce from the underlying
//! `polyplan-*` crates.
//!
//! # Quick Start
//!
//! Compile a filter against a batch schema:
//!
//! ```rust
//! use arrow::datatypes::{DataType, Field};
//! use polyplan::{BatchSchema, CompileContext, Filter, FunctionRegistry, Op, compile_filter};
//!
//! let schema = BatchSchema::from_fields(vec![
//!     Field::new("cpu.usage", DataType::Float64, true),
//!     Field::new("cpu.host", DataType::Utf8, true),
//! ]);
//! let registry = FunctionRegistry::with_builtins();
//! let mut ctx = CompileContext::new(&registry);
//!
//! let filter = Filter::all_of(vec![
//!     Filter::value("cpu.host", Op::Like, "web-.*"),
//!     Filter::value("cpu.usage", Op::Gt, 0.9f64),
//! ]);
//! let predicate = compile_filter(&mut ctx, &schema, &filter).unwrap();
//! assert_eq!(predicate.to_string(), "and(greater(#0, 0.9), like_const(#1, 'web-.*'))");
//! ```
//!
//! # Architecture
//!
//! The workspace is layered; each layer only calls down:
//!
//! - **Join compilation** (`polyplan-join`): equi-key extraction, residual predicates,
//!   output projection, and hash/nested-loop strategy selection.
//! - **Expression and filter compilation** (`polyplan-plan`): schema resolution,
//!   `Not` elimination, predicate reordering, and binding names to field indices.
//! - **Functions and evaluation** (`polyplan-compute`): the function catalog and a
//!   reference row evaluator.
//! - **Trees** (`polyplan-expr`): logical and physical expression and filter types.
//! - **Foundations** (`polyplan-types`, `polyplan-result`): values, schemas, errors.
//!
//! # Re-exports
//!
//! - [`compile_expression`], [`compile_filter`], [`compile_join`], [`resolve_pattern`]
//! - [`expr`]: logical and physical trees
//! - [`eval`]: reference evaluation of compiled plans
#![forbid(unsafe_code)]

pub use polyplan_join::{
    EquiKey, JoinAlgorithm, JoinDescriptor, JoinOptions, JoinPlan, JoinStrategy, JoinType,
    compile_join, natural_join_columns, validate_join_options,
};
pub use polyplan_plan::{
    CompileContext, CompileOptions, LiteralPool, compile_expression, compile_filter,
    resolve_pattern,
};

pub use polyplan_compute::{
    Function, FunctionCatalog, FunctionParams, FunctionRegistry, MappingType,
};
pub use polyplan_expr::{Expr, Filter, InOp, Op, PredicateExpr, ScalarExpr};
pub use polyplan_result::{Error, Result};
pub use polyplan_types::{BatchSchema, Value, ValueType, key_field};

pub mod expr {
    //! Logical input trees and physical output trees.

    pub use polyplan_expr::{
        ArithmeticOp, CaseWhenExpr, Expr, Filter, FunctionExpr, InOp, LikePattern, Op,
        PredicateExpr, PredicateFunction, ScalarExpr, ScalarFunction, TemporalUnit,
    };
}

pub mod eval {
    //! Reference evaluation of compiled expressions and join plans.
    //!
    //! These interpreters run one row at a time and exist to check compiled plans.

    pub use polyplan_compute::{Datum, Row, RowEvaluator, batch_rows};
    pub use polyplan_join::{execute_join, hash_join, nested_loop_join};
}
