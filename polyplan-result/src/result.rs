use crate::error::Error;

/// Result type alias used throughout polyplan.
///
/// Shorthand for `std::result::Result<T, Error>`. Every fallible compile, resolve, or
/// evaluate call returns this type.
pub type Result<T> = std::result::Result<T, Error>;
