//! Index-based physical expression trees produced by the compiler.
//!
//! Columns are referenced by position in a concrete batch schema. The only names that
//! survive compilation are optional output aliases.

use std::fmt;
use std::sync::Arc;

use polyplan_result::{Error, Result};
use polyplan_types::Value;
use regex::bytes::Regex;
use rustc_hash::FxHashSet;

use crate::logical::Op;

/// Calendar field extracted by [`ScalarFunction::Extract`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TemporalUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TemporalUnit {
    /// Parse a unit name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "year" => Some(TemporalUnit::Year),
            "month" => Some(TemporalUnit::Month),
            "day" => Some(TemporalUnit::Day),
            "hour" => Some(TemporalUnit::Hour),
            "minute" => Some(TemporalUnit::Minute),
            "second" => Some(TemporalUnit::Second),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TemporalUnit::Year => "year",
            TemporalUnit::Month => "month",
            TemporalUnit::Day => "day",
            TemporalUnit::Hour => "hour",
            TemporalUnit::Minute => "minute",
            TemporalUnit::Second => "second",
        }
    }
}

/// Scalar function applied by a [`ScalarExpr::Call`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarFunction {
    Add,
    Minus,
    Multiply,
    Ratio,
    Mod,
    Negate,
    /// Boolean negation, used for anti-join marks.
    Not,
    /// Arguments are `[cond1, value1, cond2, value2, ..., else?]`.
    CaseWhen,
    /// Combined hash of all arguments, used as hash-join bucket key.
    Hash,
    /// Calendar field of an epoch-milliseconds timestamp.
    Extract(TemporalUnit),
}

impl ScalarFunction {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarFunction::Add => "add",
            ScalarFunction::Minus => "minus",
            ScalarFunction::Multiply => "multiply",
            ScalarFunction::Ratio => "ratio",
            ScalarFunction::Mod => "mod",
            ScalarFunction::Negate => "negate",
            ScalarFunction::Not => "not",
            ScalarFunction::CaseWhen => "case_when",
            ScalarFunction::Hash => "hash",
            ScalarFunction::Extract(_) => "extract",
        }
    }
}

/// Physical value expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarExpr {
    Field {
        index: usize,
        alias: Option<String>,
    },
    /// Literal shared through the compilation's literal pool.
    Literal {
        value: Arc<Value>,
        alias: Option<String>,
    },
    Call {
        function: ScalarFunction,
        args: Vec<ScalarExpr>,
        alias: Option<String>,
    },
    Rename {
        alias: String,
        child: Box<ScalarExpr>,
    },
    /// Boolean-valued argument, used by [`ScalarFunction::CaseWhen`].
    Predicate(Box<PredicateExpr>),
}

impl ScalarExpr {
    #[inline]
    pub fn field(index: usize) -> ScalarExpr {
        ScalarExpr::Field { index, alias: None }
    }

    #[inline]
    pub fn field_as(index: usize, alias: impl Into<String>) -> ScalarExpr {
        ScalarExpr::Field {
            index,
            alias: Some(alias.into()),
        }
    }

    #[inline]
    pub fn literal(value: Arc<Value>) -> ScalarExpr {
        ScalarExpr::Literal { value, alias: None }
    }

    #[inline]
    pub fn call(function: ScalarFunction, args: Vec<ScalarExpr>) -> ScalarExpr {
        ScalarExpr::Call {
            function,
            args,
            alias: None,
        }
    }

    #[inline]
    pub fn rename(alias: impl Into<String>, child: ScalarExpr) -> ScalarExpr {
        ScalarExpr::Rename {
            alias: alias.into(),
            child: Box::new(child),
        }
    }

    /// Output alias of this node, if any.
    pub fn alias(&self) -> Option<&str> {
        match self {
            ScalarExpr::Field { alias, .. }
            | ScalarExpr::Literal { alias, .. }
            | ScalarExpr::Call { alias, .. } => alias.as_deref(),
            ScalarExpr::Rename { alias, .. } => Some(alias),
            ScalarExpr::Predicate(_) => None,
        }
    }

    /// Replace the alias of an aliasable node; other nodes are wrapped in `Rename`.
    pub fn with_alias(self, new_alias: impl Into<String>) -> ScalarExpr {
        let new_alias: String = new_alias.into();
        match self {
            ScalarExpr::Field { index, .. } => ScalarExpr::Field {
                index,
                alias: Some(new_alias),
            },
            ScalarExpr::Literal { value, .. } => ScalarExpr::Literal {
                value,
                alias: Some(new_alias),
            },
            ScalarExpr::Call { function, args, .. } => ScalarExpr::Call {
                function,
                args,
                alias: Some(new_alias),
            },
            other => ScalarExpr::Rename {
                alias: new_alias,
                child: Box::new(other),
            },
        }
    }

    /// Field indices referenced anywhere below this node, in visit order.
    pub fn referenced_fields(&self) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<&ScalarExpr> = vec![self];
        let mut predicates: Vec<&PredicateExpr> = Vec::new();
        loop {
            if let Some(expr) = stack.pop() {
                match expr {
                    ScalarExpr::Field { index, .. } => out.push(*index),
                    ScalarExpr::Literal { .. } => {}
                    ScalarExpr::Call { args, .. } => stack.extend(args.iter().rev()),
                    ScalarExpr::Rename { child, .. } => stack.push(child),
                    ScalarExpr::Predicate(pred) => predicates.push(pred),
                }
            } else if let Some(pred) = predicates.pop() {
                match pred {
                    PredicateExpr::Compare { operands, .. } => stack.extend(operands.iter().rev()),
                    PredicateExpr::And(children) | PredicateExpr::Or(children) => {
                        predicates.extend(children.iter().rev())
                    }
                    PredicateExpr::True | PredicateExpr::False => {}
                }
            } else {
                break;
            }
        }
        out
    }
}

/// `LIKE` pattern: a regular expression that must match the whole value.
///
/// `'teeth' LIKE '.*th'` holds, `'teeth' LIKE 'th'` does not.
#[derive(Clone, Debug)]
pub struct LikePattern {
    pattern: Vec<u8>,
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &[u8]) -> Result<Self> {
        let invalid = |reason: &dyn fmt::Display| {
            Error::unsupported(format_args!(
                "invalid LIKE pattern '{}': {reason}",
                String::from_utf8_lossy(pattern)
            ))
        };
        let source = std::str::from_utf8(pattern).map_err(|err| invalid(&err))?;
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|err| invalid(&err))?;
        Ok(Self {
            pattern: pattern.to_vec(),
            regex,
        })
    }

    pub fn pattern(&self) -> &[u8] {
        &self.pattern
    }

    pub fn is_match(&self, value: &[u8]) -> bool {
        self.regex.is_match(value)
    }
}

impl PartialEq for LikePattern {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

/// Predicate applied by a [`PredicateExpr::Compare`].
#[derive(Clone, Debug, PartialEq)]
pub enum PredicateFunction {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Like,
    NotLike,
    EqualConst(Arc<Value>),
    NotEqualConst(Arc<Value>),
    LikeConst(LikePattern),
    NotLikeConst(LikePattern),
    InSet(Arc<FxHashSet<Value>>),
    NotInSet(Arc<FxHashSet<Value>>),
}

impl PredicateFunction {
    /// Binary predicate for a comparison operator, ignoring fan-out semantics.
    pub fn from_op(op: Op) -> PredicateFunction {
        match op.base() {
            Op::Eq => PredicateFunction::Equal,
            Op::NotEq => PredicateFunction::NotEqual,
            Op::Gt => PredicateFunction::Greater,
            Op::GtEq => PredicateFunction::GreaterEqual,
            Op::Lt => PredicateFunction::Less,
            Op::LtEq => PredicateFunction::LessEqual,
            Op::Like => PredicateFunction::Like,
            _ => PredicateFunction::NotLike,
        }
    }

    /// Number of operands the predicate consumes.
    pub fn arity(&self) -> usize {
        match self {
            PredicateFunction::Equal
            | PredicateFunction::NotEqual
            | PredicateFunction::Less
            | PredicateFunction::LessEqual
            | PredicateFunction::Greater
            | PredicateFunction::GreaterEqual
            | PredicateFunction::Like
            | PredicateFunction::NotLike => 2,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PredicateFunction::Equal => "equal",
            PredicateFunction::NotEqual => "not_equal",
            PredicateFunction::Less => "less",
            PredicateFunction::LessEqual => "less_equal",
            PredicateFunction::Greater => "greater",
            PredicateFunction::GreaterEqual => "greater_equal",
            PredicateFunction::Like => "like",
            PredicateFunction::NotLike => "not_like",
            PredicateFunction::EqualConst(_) => "equal_const",
            PredicateFunction::NotEqualConst(_) => "not_equal_const",
            PredicateFunction::LikeConst(_) => "like_const",
            PredicateFunction::NotLikeConst(_) => "not_like_const",
            PredicateFunction::InSet(_) => "in_set",
            PredicateFunction::NotInSet(_) => "not_in_set",
        }
    }
}

/// Physical boolean expression.
#[derive(Clone, Debug, PartialEq)]
pub enum PredicateExpr {
    Compare {
        function: PredicateFunction,
        operands: Vec<ScalarExpr>,
    },
    And(Vec<PredicateExpr>),
    Or(Vec<PredicateExpr>),
    True,
    False,
}

impl PredicateExpr {
    #[inline]
    pub fn compare(function: PredicateFunction, operands: Vec<ScalarExpr>) -> PredicateExpr {
        PredicateExpr::Compare { function, operands }
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Field { index, alias } => {
                write!(f, "#{index}")?;
                write_alias(f, alias.as_deref())
            }
            ScalarExpr::Literal { value, alias } => {
                write!(f, "{value}")?;
                write_alias(f, alias.as_deref())
            }
            ScalarExpr::Call {
                function,
                args,
                alias,
            } => {
                match function {
                    ScalarFunction::Extract(unit) => write!(f, "extract_{}(", unit.as_str())?,
                    other => write!(f, "{}(", other.name())?,
                }
                write_list(f, args)?;
                write!(f, ")")?;
                write_alias(f, alias.as_deref())
            }
            ScalarExpr::Rename { alias, child } => write!(f, "{child} AS {alias}"),
            ScalarExpr::Predicate(pred) => write!(f, "{pred}"),
        }
    }
}

impl fmt::Display for PredicateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateExpr::Compare { function, operands } => {
                write!(f, "{}(", function.name())?;
                write_list(f, operands)?;
                match function {
                    PredicateFunction::EqualConst(value)
                    | PredicateFunction::NotEqualConst(value) => write!(f, ", {value}")?,
                    PredicateFunction::LikeConst(pattern)
                    | PredicateFunction::NotLikeConst(pattern) => {
                        write!(f, ", '{}'", String::from_utf8_lossy(pattern.pattern()))?
                    }
                    PredicateFunction::InSet(set) | PredicateFunction::NotInSet(set) => {
                        write!(f, ", {{{} values}}", set.len())?
                    }
                    _ => {}
                }
                write!(f, ")")
            }
            PredicateExpr::And(children) => {
                write!(f, "and(")?;
                write_list(f, children)?;
                write!(f, ")")
            }
            PredicateExpr::Or(children) => {
                write!(f, "or(")?;
                write_list(f, children)?;
                write!(f, ")")
            }
            PredicateExpr::True => write!(f, "true"),
            PredicateExpr::False => write!(f, "false"),
        }
    }
}

fn write_alias(f: &mut fmt::Formatter<'_>, alias: Option<&str>) -> fmt::Result {
    match alias {
        Some(alias) => write!(f, " AS {alias}"),
        None => Ok(()),
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_is_anchored_regex() {
        let suffix = LikePattern::new(b".*th").unwrap();
        assert!(suffix.is_match(b"teeth"));
        assert!(!suffix.is_match(b"teethe"));

        let literal = LikePattern::new(b"th").unwrap();
        assert!(!literal.is_match(b"teeth"));

        let class = LikePattern::new(b"^[s|f].*").unwrap();
        assert!(class.is_match(b"south"));
        assert!(class.is_match(b"far"));
        assert!(!class.is_match(b"north"));
    }

    #[test]
    fn like_pattern_alternation_covers_whole_value() {
        let pattern = LikePattern::new(b"ab|cd").unwrap();
        assert!(pattern.is_match(b"ab"));
        assert!(pattern.is_match(b"cd"));
        assert!(!pattern.is_match(b"abcd"));
        assert!(!pattern.is_match(b"xcd"));
    }

    #[test]
    fn like_pattern_rejects_bad_regex() {
        assert!(matches!(
            LikePattern::new(b"(unclosed"),
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            LikePattern::new(&[0xff, b'a']),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn referenced_fields_walks_predicates() {
        let expr = ScalarExpr::call(
            ScalarFunction::CaseWhen,
            vec![
                ScalarExpr::Predicate(Box::new(PredicateExpr::compare(
                    PredicateFunction::Equal,
                    vec![ScalarExpr::field(3), ScalarExpr::field(1)],
                ))),
                ScalarExpr::field(0),
            ],
        );
        assert_eq!(expr.referenced_fields(), vec![0, 3, 1]);
    }

    #[test]
    fn display_renders_aliases() {
        let expr = ScalarExpr::call(
            ScalarFunction::Add,
            vec![
                ScalarExpr::field(0),
                ScalarExpr::literal(Arc::new(Value::Long(3))),
            ],
        )
        .with_alias("total");
        assert_eq!(expr.to_string(), "add(#0, 3) AS total");
        assert_eq!(
            ScalarExpr::rename("r", ScalarExpr::field(2)).to_string(),
            "#2 AS r"
        );
    }
}
