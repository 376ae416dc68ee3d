//! Binding dotted path patterns to field indices.
//!
//! A pattern without `*` matches a field name exactly. `*` alone matches every field.
//! Otherwise each run of `*` matches any sequence of characters (dots included) and
//! the remaining text is literal; the whole field name must match.
//!
//! The raw matchers return every match in schema order and never fail. The
//! `resolve_*` helpers enforce "exactly one" and report the schema on failure.

use polyplan_result::{Error, Result};
use polyplan_types::BatchSchema;
use regex::Regex;

enum Matcher<'p> {
    All,
    Exact(&'p str),
    Wildcard(Regex),
}

impl<'p> Matcher<'p> {
    fn new(pattern: &'p str) -> Result<Self> {
        if pattern == "*" {
            return Ok(Matcher::All);
        }
        if !pattern.contains('*') {
            return Ok(Matcher::Exact(pattern));
        }
        let mut source = String::from("(?s)^");
        let mut in_star = false;
        let mut literal = String::new();
        for ch in pattern.chars() {
            if ch == '*' {
                if !in_star {
                    source.push_str(&regex::escape(&literal));
                    literal.clear();
                    source.push_str(".*");
                    in_star = true;
                }
            } else {
                literal.push(ch);
                in_star = false;
            }
        }
        source.push_str(&regex::escape(&literal));
        source.push('$');
        Regex::new(&source)
            .map(Matcher::Wildcard)
            .map_err(|err| Error::unsupported(format_args!("path pattern '{pattern}': {err}")))
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Exact(pattern) => *pattern == name,
            Matcher::Wildcard(regex) => regex.is_match(name),
        }
    }
}

fn collect_matches(schema: &BatchSchema, pattern: &str, include_key: bool) -> Vec<usize> {
    let Ok(matcher) = Matcher::new(pattern) else {
        return Vec::new();
    };
    schema
        .names()
        .enumerate()
        .filter(|(idx, name)| (include_key || !schema.is_key(*idx)) && matcher.matches(name))
        .map(|(idx, _)| idx)
        .collect()
}

/// Every field index whose name matches `pattern`, key field included.
pub fn match_pattern(schema: &BatchSchema, pattern: &str) -> Vec<usize> {
    collect_matches(schema, pattern, true)
}

/// Every non-key field index whose name matches `pattern`.
pub fn match_pattern_ignore_key(schema: &BatchSchema, pattern: &str) -> Vec<usize> {
    collect_matches(schema, pattern, false)
}

/// Non-key fields whose name equals `name` literally; `*` has no special meaning.
pub fn match_exact_ignore_key(schema: &BatchSchema, name: &str) -> Vec<usize> {
    schema
        .names()
        .enumerate()
        .filter(|(idx, field)| !schema.is_key(*idx) && *field == name)
        .map(|(idx, _)| idx)
        .collect()
}

/// Pattern resolution with an explicit key policy.
pub fn resolve_pattern(schema: &BatchSchema, pattern: &str, include_key: bool) -> Vec<usize> {
    collect_matches(schema, pattern, include_key)
}

/// Resolve `pattern` to exactly one non-key field.
pub fn resolve_unique(schema: &BatchSchema, pattern: &str) -> Result<usize> {
    let matches = match_pattern_ignore_key(schema, pattern);
    expect_unique(schema, pattern, matches)
}

/// Enforce that `matches` holds exactly one index.
pub fn expect_unique(schema: &BatchSchema, pattern: &str, matches: Vec<usize>) -> Result<usize> {
    match matches.as_slice() {
        [only] => Ok(*only),
        [] => Err(Error::column_not_found(pattern, schema.names())),
        many => Err(Error::ambiguous_column(
            pattern,
            many.iter().filter_map(|idx| schema.name(*idx)),
            schema.names(),
        )),
    }
}

/// Index of the schema's single key field.
pub fn resolve_key(schema: &BatchSchema) -> Result<usize> {
    let keys = schema.key_indices();
    match keys.as_slice() {
        [only] => Ok(*only),
        _ => Err(Error::ambiguous_key(keys.len(), schema.names())),
    }
}
