//! Filter compiler: logical [`Filter`] to physical [`PredicateExpr`].
//!
//! Compilation runs in two phases:
//!
//! 1. Normalization: `Not` is pushed to the leaves and eliminated, then (unless
//!    disabled in [`CompileOptions`]) the children of every `And`/`Or` are sorted
//!    cheapest first.
//! 2. Translation: each leaf is bound to the schema. A value or `IN` leaf whose path
//!    matches several fields fans out into one comparison per match, combined with
//!    `Or` for "any" operators and `And` for "all" operators.
//!
//! Connectives are simplified on the way up by [`and_predicates`] and
//! [`or_predicates`].

use std::sync::Arc;

use polyplan_expr::{
    Filter, InOp, LikePattern, Op, PredicateExpr, PredicateFunction, ScalarExpr, contains_not,
    push_not, reorder,
};
use polyplan_result::{Error, Result};
use polyplan_types::{BatchSchema, Value};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::context::{CompileContext, CompileOptions};
use crate::expression::compile_expression;
use crate::resolver::{match_pattern_ignore_key, resolve_key, resolve_unique};

/// Compile `filter` against `schema`.
pub fn compile_filter(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    filter: &Filter,
) -> Result<PredicateExpr> {
    let normalized = normalize_filter(filter.clone(), ctx.options());
    debug_assert!(!contains_not(&normalized), "NOT survived normalization: {normalized}");
    let compiled = compile(ctx, schema, &normalized)?;
    debug!(
        fields = schema.field_count(),
        literals = ctx.pool().len(),
        "compiled filter"
    );
    trace!(filter = %filter, compiled = %compiled, "filter plan");
    Ok(compiled)
}

/// Apply `Not` elimination and, if enabled, cheap-first reordering.
pub fn normalize_filter(filter: Filter, options: &CompileOptions) -> Filter {
    let filter = push_not(filter);
    if options.reorder_predicates {
        reorder(filter)
    } else {
        filter
    }
}

fn compile(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    filter: &Filter,
) -> Result<PredicateExpr> {
    match filter {
        Filter::Bool(true) => Ok(PredicateExpr::True),
        Filter::Bool(false) => Ok(PredicateExpr::False),
        Filter::Value { path, op, value } => {
            let indices = match_pattern_ignore_key(schema, path);
            if indices.is_empty() {
                return Err(Error::column_not_found(path.as_str(), schema.names()));
            }
            compile_value_leaf(ctx, &indices, *op, value)
        }
        Filter::Key { op, value } => {
            let index = resolve_key(schema)?;
            compile_value_leaf(ctx, &[index], *op, &Value::Long(*value))
        }
        Filter::Path { path_a, op, path_b } => {
            let left = resolve_unique(schema, path_a)?;
            let right = resolve_unique(schema, path_b)?;
            Ok(PredicateExpr::compare(
                PredicateFunction::from_op(*op),
                vec![ScalarExpr::field(left), ScalarExpr::field(right)],
            ))
        }
        Filter::Expr { left, op, right } => {
            let left = compile_expression(ctx, schema, left, false)?;
            let right = compile_expression(ctx, schema, right, false)?;
            Ok(PredicateExpr::compare(
                PredicateFunction::from_op(*op),
                vec![left, right],
            ))
        }
        Filter::In { path, op, values } => compile_in(schema, path, *op, values),
        Filter::And(children) => {
            let mut compiled = Vec::with_capacity(children.len());
            for child in children {
                compiled.push(compile(ctx, schema, child)?);
            }
            Ok(and_predicates(compiled))
        }
        Filter::Or(children) => {
            let mut compiled = Vec::with_capacity(children.len());
            for child in children {
                compiled.push(compile(ctx, schema, child)?);
            }
            Ok(or_predicates(compiled))
        }
        Filter::Not(_) => Err(Error::unsupported(
            "NOT must be eliminated before filter compilation",
        )),
    }
}

fn compile_value_leaf(
    ctx: &mut CompileContext<'_>,
    indices: &[usize],
    op: Op,
    value: &Value,
) -> Result<PredicateExpr> {
    let mut comparisons = Vec::with_capacity(indices.len());
    for index in indices {
        comparisons.push(value_predicate(ctx, *index, op, value)?);
    }
    Ok(if op.is_or_op() {
        or_predicates(comparisons)
    } else {
        and_predicates(comparisons)
    })
}

fn value_predicate(
    ctx: &mut CompileContext<'_>,
    index: usize,
    op: Op,
    value: &Value,
) -> Result<PredicateExpr> {
    let field = ScalarExpr::field(index);
    let pattern = if op.is_like() {
        let bytes = value.as_binary().ok_or_else(|| {
            Error::unsupported(format_args!(
                "'{op}' against {} value {value}",
                value.value_type()
            ))
        })?;
        Some(bytes)
    } else {
        None
    };

    if ctx.options().fold_constant_predicates {
        let folded = match (op.base(), pattern) {
            (Op::Eq, _) => Some(PredicateFunction::EqualConst(ctx.literal(value))),
            (Op::NotEq, _) => Some(PredicateFunction::NotEqualConst(ctx.literal(value))),
            (Op::Like, Some(bytes)) => Some(PredicateFunction::LikeConst(LikePattern::new(bytes)?)),
            (Op::NotLike, Some(bytes)) => {
                Some(PredicateFunction::NotLikeConst(LikePattern::new(bytes)?))
            }
            _ => None,
        };
        if let Some(function) = folded {
            return Ok(PredicateExpr::compare(function, vec![field]));
        }
    }

    let literal = ScalarExpr::literal(ctx.literal(value));
    Ok(PredicateExpr::compare(
        PredicateFunction::from_op(op),
        vec![field, literal],
    ))
}

fn compile_in(
    schema: &BatchSchema,
    path: &str,
    op: InOp,
    values: &[Value],
) -> Result<PredicateExpr> {
    let indices = match_pattern_ignore_key(schema, path);
    if indices.is_empty() {
        return Err(Error::column_not_found(path, schema.names()));
    }
    let mut memberships = Vec::with_capacity(indices.len());
    for index in indices {
        let value_type = schema.value_type(index)?;
        let set: FxHashSet<Value> = values
            .iter()
            .filter(|value| value.value_type() == value_type)
            .cloned()
            .collect();
        let set = Arc::new(set);
        let function = if op.is_not_op() {
            PredicateFunction::NotInSet(set)
        } else {
            PredicateFunction::InSet(set)
        };
        memberships.push(PredicateExpr::compare(
            function,
            vec![ScalarExpr::field(index)],
        ));
    }
    Ok(if op.is_or_op() {
        or_predicates(memberships)
    } else {
        and_predicates(memberships)
    })
}

/// Conjunction of `children`, simplified.
///
/// Nested `And`s are spliced in and `True` children dropped. Any `False` child makes
/// the result `False`; no children make it `True`; a single child is returned as is.
pub fn and_predicates(children: impl IntoIterator<Item = PredicateExpr>) -> PredicateExpr {
    connective(children, true)
}

/// Disjunction of `children`, simplified. The exact dual of [`and_predicates`].
pub fn or_predicates(children: impl IntoIterator<Item = PredicateExpr>) -> PredicateExpr {
    connective(children, false)
}

fn connective(
    children: impl IntoIterator<Item = PredicateExpr>,
    conjunction: bool,
) -> PredicateExpr {
    let mut stack: Vec<PredicateExpr> = children.into_iter().collect();
    stack.reverse();
    let mut flat = Vec::with_capacity(stack.len());
    while let Some(child) = stack.pop() {
        match child {
            PredicateExpr::And(nested) if conjunction => stack.extend(nested.into_iter().rev()),
            PredicateExpr::Or(nested) if !conjunction => stack.extend(nested.into_iter().rev()),
            PredicateExpr::True if conjunction => {}
            PredicateExpr::False if !conjunction => {}
            // The absorbing element decides the whole connective.
            PredicateExpr::True => return PredicateExpr::True,
            PredicateExpr::False => return PredicateExpr::False,
            other => flat.push(other),
        }
    }
    match flat.len() {
        0 if conjunction => PredicateExpr::True,
        0 => PredicateExpr::False,
        1 => flat.swap_remove(0),
        _ if conjunction => PredicateExpr::And(flat),
        _ => PredicateExpr::Or(flat),
    }
}
