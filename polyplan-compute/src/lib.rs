//! Functions and evaluation for compiled polyplan expressions.
//!
//! - [`function`]: the [`Function`]/[`FunctionCatalog`] interfaces the expression
//!   compiler resolves calls against, and the [`FunctionRegistry`] implementation
//! - [`extract`]: the builtin `extract(path, unit)` row function
//! - [`eval`]: a row-at-a-time reference evaluator used to verify compiled plans
#![forbid(unsafe_code)]

pub mod eval;
pub mod extract;
pub mod function;

pub use eval::{Datum, Row, RowEvaluator, batch_rows, compare_values, hash_datum};
pub use extract::{Extract, extract_unit};
pub use function::{Function, FunctionCatalog, FunctionParams, FunctionRegistry, MappingType};
