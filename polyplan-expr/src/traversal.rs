//! Stack-safe bottom-up folds over filter trees.
//!
//! Generated filters can nest thousands of levels deep, so
//! [`fold_postorder`] keeps its own frame stack instead of recursing.
//!
//! ```
//! use polyplan_expr::traversal::fold_postorder;
//! use polyplan_expr::{Filter, Op};
//!
//! let filter = Filter::any_of(vec![
//!     Filter::value("a", Op::Eq, 1i64),
//!     Filter::all_of(vec![Filter::key(Op::Gt, 3), Filter::Bool(true)]),
//! ]);
//! let connectives = fold_postorder(&filter, |node, below: Vec<usize>| {
//!     let own = usize::from(matches!(node, Filter::And(_) | Filter::Or(_)));
//!     Ok(own + below.iter().sum::<usize>())
//! });
//! assert_eq!(connectives.unwrap(), 2);
//! ```

use polyplan_result::{Error, Result};

use crate::logical::Filter;

/// A tree whose nodes can hand out their direct children.
pub trait TreeNode {
    /// Direct children, in the order their fold results are delivered.
    fn children(&self) -> Vec<&Self>;
}

impl TreeNode for Filter {
    fn children(&self) -> Vec<&Self> {
        match self {
            Filter::And(children) | Filter::Or(children) => children.iter().collect(),
            Filter::Not(child) => vec![child.as_ref()],
            _ => Vec::new(),
        }
    }
}

/// Fold `root` bottom-up. `combine` is called once per node, after every child, with
/// the children's results in child order.
pub fn fold_postorder<T, O, F>(root: &T, mut combine: F) -> Result<O>
where
    T: TreeNode,
    F: FnMut(&T, Vec<O>) -> Result<O>,
{
    // (node, arity once expanded)
    let mut pending: Vec<(&T, Option<usize>)> = vec![(root, None)];
    let mut done: Vec<O> = Vec::new();

    while let Some((node, arity)) = pending.pop() {
        match arity {
            None => {
                let children = node.children();
                pending.push((node, Some(children.len())));
                pending.extend(children.into_iter().rev().map(|child| (child, None)));
            }
            Some(arity) => {
                let Some(split) = done.len().checked_sub(arity) else {
                    return Err(Error::Internal(format!(
                        "postorder fold lost results: need {arity}, have {}",
                        done.len()
                    )));
                };
                let below = done.split_off(split);
                done.push(combine(node, below)?);
            }
        }
    }

    match (done.pop(), done.is_empty()) {
        (Some(result), true) => Ok(result),
        _ => Err(Error::Internal(
            "postorder fold ended without a single root result".into(),
        )),
    }
}
