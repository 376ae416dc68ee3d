//! Filter normalization run before compilation.
//!
//! - [`push_not`] eliminates every `Not` node by pushing negation to the leaves
//!   (De Morgan's laws) and flipping leaf operators.
//! - [`reorder`] sorts the children of every `And`/`Or` so cheap predicates are
//!   evaluated first and can short-circuit expensive ones.
//!
//! Both rewrites consume the input tree and return a new one, and both are idempotent.

use crate::logical::Filter;
use crate::traversal::fold_postorder;
use crate::visitor::{FilterVisitor, walk_filter};
use polyplan_types::Value;

/// Remove every `Not` from `filter`.
pub fn push_not(filter: Filter) -> Filter {
    match filter {
        Filter::And(children) => Filter::And(children.into_iter().map(push_not).collect()),
        Filter::Or(children) => Filter::Or(children.into_iter().map(push_not).collect()),
        Filter::Not(inner) => negate(*inner),
        leaf => leaf,
    }
}

fn negate(filter: Filter) -> Filter {
    match filter {
        Filter::Not(nested) => push_not(*nested),
        Filter::And(children) => Filter::Or(children.into_iter().map(negate).collect()),
        Filter::Or(children) => Filter::And(children.into_iter().map(negate).collect()),
        Filter::Bool(value) => Filter::Bool(!value),
        Filter::Value { path, op, value } => Filter::Value {
            path,
            op: op.opposite(),
            value,
        },
        Filter::Path { path_a, op, path_b } => Filter::Path {
            path_a,
            op: op.opposite(),
            path_b,
        },
        Filter::Key { op, value } => Filter::Key {
            op: op.opposite(),
            value,
        },
        Filter::Expr { left, op, right } => Filter::Expr {
            left,
            op: op.opposite(),
            right,
        },
        Filter::In { path, op, values } => Filter::In {
            path,
            op: op.opposite(),
            values,
        },
    }
}

/// Stable-sort the children of every `And`/`Or` by ascending [`complexity`].
pub fn reorder(filter: Filter) -> Filter {
    match filter {
        Filter::And(children) => Filter::And(reorder_children(children)),
        Filter::Or(children) => Filter::Or(reorder_children(children)),
        Filter::Not(inner) => Filter::Not(Box::new(reorder(*inner))),
        leaf => leaf,
    }
}

fn reorder_children(children: Vec<Filter>) -> Vec<Filter> {
    let mut children: Vec<Filter> = children.into_iter().map(reorder).collect();
    children.sort_by_cached_key(complexity);
    children
}

/// Number of expensive leaves under `filter`.
///
/// A leaf is expensive when it compares against binary data (string equality,
/// `LIKE`, binary `IN` sets) or evaluates a computed expression.
pub fn complexity(filter: &Filter) -> usize {
    let score = fold_postorder(filter, |node, below: Vec<usize>| {
        Ok(leaf_cost(node) + below.into_iter().sum::<usize>())
    });
    // Only a corrupted frame stack fails the fold; such a subtree sorts last.
    score.unwrap_or(usize::MAX)
}

fn leaf_cost(node: &Filter) -> usize {
    let expensive = match node {
        Filter::Value { value, .. } => value.is_binary(),
        Filter::Expr { .. } => true,
        Filter::In { values, .. } => values.iter().any(Value::is_binary),
        _ => false,
    };
    usize::from(expensive)
}

/// Whether any `Not` node remains in `filter`.
pub fn contains_not(filter: &Filter) -> bool {
    let mut finder = NotFinder::default();
    walk_filter(filter, &mut finder);
    finder.found
}

#[derive(Default)]
struct NotFinder {
    found: bool,
}

impl FilterVisitor for NotFinder {
    fn enter_not(&mut self, _child: &Filter) {
        self.found = true;
    }
}
