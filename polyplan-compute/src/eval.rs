//! Row-at-a-time reference evaluator for compiled expressions.
//!
//! This is a verification aid, not an execution engine: it interprets
//! [`ScalarExpr`]/[`PredicateExpr`] trees over a single row so compiled plans can be
//! checked against expected results.
//!
//! # Semantics
//!
//! - NULL operands propagate through arithmetic and make every comparison false.
//! - `Integer op Integer` stays 32-bit; mixed integers widen to 64-bit; any float
//!   operand evaluates in `f64`. Integer overflow is an evaluation error.
//! - Integer division or modulo by zero yields NULL.
//! - Numbers of different widths compare and hash by numeric value.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use arrow::record_batch::RecordBatch;
use polyplan_expr::{LikePattern, PredicateExpr, PredicateFunction, ScalarExpr, ScalarFunction};
use polyplan_result::{Error, Result};
use polyplan_types::{Value, read_value};
use rustc_hash::FxHasher;

use crate::extract::extract_unit;

/// A nullable cell.
pub type Datum = Option<Value>;

/// One row of cells, positionally aligned with a batch schema.
pub type Row = Vec<Datum>;

/// Read every row of `batch`.
pub fn batch_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let mut rows = Vec::with_capacity(batch.num_rows());
    for row_idx in 0..batch.num_rows() {
        let mut row = Vec::with_capacity(batch.num_columns());
        for column in batch.columns() {
            row.push(read_value(column, row_idx)?);
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Interprets compiled expressions over a single row.
pub struct RowEvaluator;

impl RowEvaluator {
    /// Evaluate a scalar expression against `row`.
    pub fn eval_scalar(expr: &ScalarExpr, row: &[Datum]) -> Result<Datum> {
        match expr {
            ScalarExpr::Field { index, .. } => row.get(*index).cloned().ok_or_else(|| {
                Error::evaluation(format_args!(
                    "field #{index} out of range for row of {} cells",
                    row.len()
                ))
            }),
            ScalarExpr::Literal { value, .. } => Ok(Some(value.as_ref().clone())),
            ScalarExpr::Rename { child, .. } => Self::eval_scalar(child, row),
            ScalarExpr::Predicate(pred) => {
                Ok(Some(Value::Boolean(Self::eval_predicate(pred, row)?)))
            }
            ScalarExpr::Call { function, args, .. } => Self::eval_call(*function, args, row),
        }
    }

    /// Evaluate a predicate against `row`.
    pub fn eval_predicate(pred: &PredicateExpr, row: &[Datum]) -> Result<bool> {
        match pred {
            PredicateExpr::True => Ok(true),
            PredicateExpr::False => Ok(false),
            PredicateExpr::And(children) => {
                for child in children {
                    if !Self::eval_predicate(child, row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            PredicateExpr::Or(children) => {
                for child in children {
                    if Self::eval_predicate(child, row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            PredicateExpr::Compare { function, operands } => {
                if operands.len() != function.arity() {
                    return Err(Error::evaluation(format_args!(
                        "{} expects {} operands, got {}",
                        function.name(),
                        function.arity(),
                        operands.len()
                    )));
                }
                let mut values = Vec::with_capacity(operands.len());
                for operand in operands {
                    match Self::eval_scalar(operand, row)? {
                        Some(value) => values.push(value),
                        None => return Ok(false),
                    }
                }
                Self::apply_predicate(function, &values)
            }
        }
    }

    fn apply_predicate(function: &PredicateFunction, values: &[Value]) -> Result<bool> {
        let ordering = || compare_values(&values[0], &values[1]);
        Ok(match function {
            PredicateFunction::Equal => ordering() == Some(Ordering::Equal),
            PredicateFunction::NotEqual => matches!(ordering(), Some(o) if o != Ordering::Equal),
            PredicateFunction::Less => ordering() == Some(Ordering::Less),
            PredicateFunction::LessEqual => {
                matches!(ordering(), Some(Ordering::Less | Ordering::Equal))
            }
            PredicateFunction::Greater => ordering() == Some(Ordering::Greater),
            PredicateFunction::GreaterEqual => {
                matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
            }
            PredicateFunction::Like | PredicateFunction::NotLike => {
                let (Some(text), Some(pattern)) = (values[0].as_binary(), values[1].as_binary())
                else {
                    return Ok(false);
                };
                let matched = LikePattern::new(pattern)?.is_match(text);
                matched == matches!(function, PredicateFunction::Like)
            }
            PredicateFunction::EqualConst(constant) => {
                compare_values(&values[0], constant) == Some(Ordering::Equal)
            }
            PredicateFunction::NotEqualConst(constant) => {
                matches!(compare_values(&values[0], constant), Some(o) if o != Ordering::Equal)
            }
            PredicateFunction::LikeConst(pattern) => values[0]
                .as_binary()
                .is_some_and(|text| pattern.is_match(text)),
            PredicateFunction::NotLikeConst(pattern) => values[0]
                .as_binary()
                .is_some_and(|text| !pattern.is_match(text)),
            PredicateFunction::InSet(set) => set.contains(&values[0]),
            PredicateFunction::NotInSet(set) => !set.contains(&values[0]),
        })
    }

    fn eval_call(function: ScalarFunction, args: &[ScalarExpr], row: &[Datum]) -> Result<Datum> {
        match function {
            ScalarFunction::CaseWhen => Self::eval_case_when(args, row),
            ScalarFunction::Hash => {
                let mut hasher = FxHasher::default();
                for arg in args {
                    hash_datum(&Self::eval_scalar(arg, row)?, &mut hasher);
                }
                Ok(Some(Value::Long(hasher.finish() as i64)))
            }
            ScalarFunction::Negate => match Self::single_arg(function, args, row)? {
                None => Ok(None),
                Some(Value::Integer(v)) => v
                    .checked_neg()
                    .map(|v| Some(Value::Integer(v)))
                    .ok_or_else(|| Error::evaluation("integer overflow in negate")),
                Some(Value::Long(v)) => v
                    .checked_neg()
                    .map(|v| Some(Value::Long(v)))
                    .ok_or_else(|| Error::evaluation("integer overflow in negate")),
                Some(Value::Float(v)) => Ok(Some(Value::Float(-v))),
                Some(Value::Double(v)) => Ok(Some(Value::Double(-v))),
                Some(other) => Err(Error::evaluation(format_args!(
                    "cannot negate {} value",
                    other.value_type()
                ))),
            },
            ScalarFunction::Not => match Self::single_arg(function, args, row)? {
                None => Ok(None),
                Some(Value::Boolean(v)) => Ok(Some(Value::Boolean(!v))),
                Some(other) => Err(Error::evaluation(format_args!(
                    "cannot apply not to {} value",
                    other.value_type()
                ))),
            },
            ScalarFunction::Extract(unit) => match Self::single_arg(function, args, row)? {
                None => Ok(None),
                Some(value) => {
                    let millis = value.as_i64().ok_or_else(|| {
                        Error::evaluation(format_args!(
                            "extract expects an integral timestamp, got {}",
                            value.value_type()
                        ))
                    })?;
                    Ok(Some(Value::Long(extract_unit(millis, unit)?)))
                }
            },
            ScalarFunction::Add
            | ScalarFunction::Minus
            | ScalarFunction::Multiply
            | ScalarFunction::Ratio
            | ScalarFunction::Mod => {
                let [left, right] = args else {
                    return Err(Error::evaluation(format_args!(
                        "{} expects 2 arguments, got {}",
                        function.name(),
                        args.len()
                    )));
                };
                let left = Self::eval_scalar(left, row)?;
                let right = Self::eval_scalar(right, row)?;
                match (left, right) {
                    (Some(left), Some(right)) => arithmetic(function, &left, &right),
                    _ => Ok(None),
                }
            }
        }
    }

    fn single_arg(function: ScalarFunction, args: &[ScalarExpr], row: &[Datum]) -> Result<Datum> {
        match args {
            [arg] => Self::eval_scalar(arg, row),
            _ => Err(Error::evaluation(format_args!(
                "{} expects 1 argument, got {}",
                function.name(),
                args.len()
            ))),
        }
    }

    fn eval_case_when(args: &[ScalarExpr], row: &[Datum]) -> Result<Datum> {
        let mut pairs = args.chunks_exact(2);
        for pair in pairs.by_ref() {
            let matched = match &pair[0] {
                ScalarExpr::Predicate(pred) => Self::eval_predicate(pred, row)?,
                other => matches!(Self::eval_scalar(other, row)?, Some(Value::Boolean(true))),
            };
            if matched {
                return Self::eval_scalar(&pair[1], row);
            }
        }
        match pairs.remainder() {
            [else_result] => Self::eval_scalar(else_result, row),
            _ => Ok(None),
        }
    }
}

/// Order two values. Numbers compare by numeric value across widths; values of
/// incomparable types (and NaN) have no ordering.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Binary(a), Value::Binary(b)) => Some(a.cmp(b)),
        _ => match (left.as_i64(), right.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => left.as_f64()?.partial_cmp(&right.as_f64()?),
        },
    }
}

/// Feed a datum into `hasher` so numerically equal values hash equally.
pub fn hash_datum<H: Hasher>(datum: &Datum, hasher: &mut H) {
    match datum {
        None => 0u8.hash(hasher),
        Some(Value::Boolean(v)) => {
            1u8.hash(hasher);
            v.hash(hasher);
        }
        Some(Value::Binary(v)) => {
            2u8.hash(hasher);
            v.hash(hasher);
        }
        Some(value) => {
            let integral = value.as_i64().or_else(|| {
                let v = value.as_f64()?;
                (v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64)
                    .then_some(v as i64)
            });
            match integral {
                Some(v) => {
                    3u8.hash(hasher);
                    v.hash(hasher);
                }
                None => {
                    4u8.hash(hasher);
                    value.as_f64().map(f64::to_bits).hash(hasher);
                }
            }
        }
    }
}

fn arithmetic(function: ScalarFunction, left: &Value, right: &Value) -> Result<Datum> {
    let overflow = || Error::evaluation(format_args!("integer overflow in {}", function.name()));
    if let (Value::Integer(a), Value::Integer(b)) = (left, right) {
        let (a, b) = (*a, *b);
        let result = match function {
            ScalarFunction::Add => a.checked_add(b).ok_or_else(overflow)?,
            ScalarFunction::Minus => a.checked_sub(b).ok_or_else(overflow)?,
            ScalarFunction::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
            ScalarFunction::Ratio if b == 0 => return Ok(None),
            ScalarFunction::Ratio => a.checked_div(b).ok_or_else(overflow)?,
            ScalarFunction::Mod if b == 0 => return Ok(None),
            ScalarFunction::Mod => a.checked_rem(b).ok_or_else(overflow)?,
            _ => return Err(Error::Internal(format!("{} is not arithmetic", function.name()))),
        };
        return Ok(Some(Value::Integer(result)));
    }
    if let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) {
        let result = match function {
            ScalarFunction::Add => a.checked_add(b).ok_or_else(overflow)?,
            ScalarFunction::Minus => a.checked_sub(b).ok_or_else(overflow)?,
            ScalarFunction::Multiply => a.checked_mul(b).ok_or_else(overflow)?,
            ScalarFunction::Ratio if b == 0 => return Ok(None),
            ScalarFunction::Ratio => a.checked_div(b).ok_or_else(overflow)?,
            ScalarFunction::Mod if b == 0 => return Ok(None),
            ScalarFunction::Mod => a.checked_rem(b).ok_or_else(overflow)?,
            _ => return Err(Error::Internal(format!("{} is not arithmetic", function.name()))),
        };
        return Ok(Some(Value::Long(result)));
    }
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Err(Error::evaluation(format_args!(
            "cannot apply {} to {} and {}",
            function.name(),
            left.value_type(),
            right.value_type()
        )));
    };
    let result = match function {
        ScalarFunction::Add => a + b,
        ScalarFunction::Minus => a - b,
        ScalarFunction::Multiply => a * b,
        ScalarFunction::Ratio => a / b,
        ScalarFunction::Mod => a % b,
        _ => return Err(Error::Internal(format!("{} is not arithmetic", function.name()))),
    };
    Ok(Some(Value::Double(result)))
}
