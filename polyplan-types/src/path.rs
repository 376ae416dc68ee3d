//! Dotted-path helpers used when qualifying join columns with a table prefix.

/// Join an optional prefix and a column suffix into a dotted path.
///
/// ```
/// use polyplan_types::qualify;
///
/// assert_eq!(qualify(Some("t"), "a"), "t.a");
/// assert_eq!(qualify(None, "a"), "a");
/// ```
pub fn qualify(prefix: Option<&str>, column: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}.{column}"),
        None => column.to_string(),
    }
}

/// Strip `prefix.` from the front of `name`. Without a prefix the whole name is the suffix.
pub fn strip_qualifier<'a>(name: &'a str, prefix: Option<&str>) -> Option<&'a str> {
    match prefix {
        Some(prefix) => name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
            .filter(|rest| !rest.is_empty()),
        None => Some(name),
    }
}
