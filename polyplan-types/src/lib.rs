//! Shared value and schema types for the polyplan crates.
//!
//! [`Value`] is the scalar carried by logical constants and physical literals.
//! [`BatchSchema`] wraps an Arrow schema and knows which field, if any, is the row key.

pub mod path;
pub mod schema;
pub mod value;

pub use path::{qualify, strip_qualifier};
pub use schema::{BatchSchema, KEY_COLUMN_NAME, KEY_META_KEY, is_key_field, key_field};
pub use value::{Value, ValueType, read_value};
