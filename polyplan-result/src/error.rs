use std::fmt;
use thiserror::Error;

/// Unified error type for all polyplan operations.
///
/// Variants carry enough context (the offending pattern and the rendered schema) to
/// diagnose a failed compilation without re-running it.
///
/// # Thread Safety
///
/// `Error` implements `Send` and `Sync`, so compile failures can be handed across
/// threads by callers that compile fragments in parallel.
#[derive(Error, Debug)]
pub enum Error {
    /// A path pattern matched no field of the schema.
    ///
    /// Raised by expression compilation of `Path`, by filter compilation of `Value`,
    /// `Path`, and `In` leaves, and by join filter construction when a join column is
    /// missing from its side.
    #[error("column '{pattern}' not found in schema [{schema}]")]
    ColumnNotFound { pattern: String, schema: String },

    /// A path pattern matched more than one field where exactly one is required.
    ///
    /// Tag-expanded schemas can contain several fields sharing a base name; this error
    /// is raised wherever such a fan-out is not explicitly allowed.
    #[error("column '{pattern}' is ambiguous, matches [{matches}] in schema [{schema}]")]
    AmbiguousColumn {
        pattern: String,
        matches: String,
        schema: String,
    },

    /// The schema does not contain exactly one key field.
    ///
    /// `found` is the number of fields flagged as key.
    #[error("expected exactly one key field, found {found} in schema [{schema}]")]
    AmbiguousKey { found: usize, schema: String },

    /// Operator, function, or configuration not supported by the compiler.
    ///
    /// Examples:
    /// - unary operators other than `+` and `-`
    /// - `DISTINCT` function calls
    /// - functions missing from the catalog or not row-mapping
    /// - `LIKE` against a non-binary constant
    /// - hash join without any equality key
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Structurally invalid logical input.
    ///
    /// Examples:
    /// - a `CASE WHEN` whose condition and result lists differ in length
    /// - an empty `Multiple` chain, or one containing an operator other than `+`/`-`
    /// - a mark join without a mark column name
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Runtime failure inside the reference evaluator.
    ///
    /// The compiler itself never raises this variant.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Arrow library error while reading record batches in the reference executors.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Internal error indicating a bug or unexpected state.
    ///
    /// This should never occur during normal operation.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Create a [`Error::ColumnNotFound`] from a pattern and the schema's field names.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyplan_result::Error;
    ///
    /// let err = Error::column_not_found("a.c", ["a.b", "key"]);
    /// assert_eq!(
    ///     err.to_string(),
    ///     "column 'a.c' not found in schema [a.b, key]"
    /// );
    /// ```
    #[inline]
    pub fn column_not_found<I, S>(pattern: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Error::ColumnNotFound {
            pattern: pattern.into(),
            schema: join_names(fields),
        }
    }

    /// Create a [`Error::AmbiguousColumn`] from a pattern, the matched names, and the
    /// schema's field names.
    #[inline]
    pub fn ambiguous_column<I, S, M, T>(pattern: impl Into<String>, matches: M, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        M: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Error::AmbiguousColumn {
            pattern: pattern.into(),
            matches: join_names(matches),
            schema: join_names(fields),
        }
    }

    /// Create a [`Error::AmbiguousKey`].
    #[inline]
    pub fn ambiguous_key<I, S>(found: usize, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Error::AmbiguousKey {
            found,
            schema: join_names(fields),
        }
    }

    /// Create an [`Error::UnsupportedOperation`] from any displayable value.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyplan_result::Error;
    ///
    /// let err = Error::unsupported(format_args!("unary operator {}", "*"));
    /// assert!(matches!(err, Error::UnsupportedOperation(msg) if msg == "unary operator *"));
    /// ```
    #[inline]
    pub fn unsupported<D: fmt::Display>(what: D) -> Self {
        Error::UnsupportedOperation(what.to_string())
    }

    /// Create an [`Error::MalformedInput`] from any displayable value.
    #[inline]
    pub fn malformed<D: fmt::Display>(what: D) -> Self {
        Error::MalformedInput(what.to_string())
    }

    /// Create an [`Error::Evaluation`] from any displayable value.
    #[inline]
    pub fn evaluation<D: fmt::Display>(what: D) -> Self {
        Error::Evaluation(what.to_string())
    }
}

fn join_names<I, S>(names: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (idx, name) in names.into_iter().enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push_str(name.as_ref());
    }
    out
}
