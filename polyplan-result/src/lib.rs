//! Error and result types for the polyplan physical planning compiler.
//!
//! Every polyplan crate returns [`Result<T>`], whose error variant is the single
//! [`Error`] enum defined here. Compilation is fail-fast: the first error aborts the
//! whole compile call and no partial plan is produced.
//!
//! # Error Categories
//!
//! - **Resolution failures** ([`Error::ColumnNotFound`], [`Error::AmbiguousColumn`],
//!   [`Error::AmbiguousKey`]): a path or key could not be bound to exactly one field
//! - **Unsupported constructs** ([`Error::UnsupportedOperation`]): an operator, function,
//!   or join configuration the compiler does not handle
//! - **Malformed input** ([`Error::MalformedInput`]): structurally invalid logical trees
//! - **Evaluation failures** ([`Error::Evaluation`], [`Error::Arrow`]): raised only by the
//!   reference evaluator and executors
//! - **Internal errors** ([`Error::Internal`]): bugs or violated invariants

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
