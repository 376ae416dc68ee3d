//! Read-only visitor over logical filter trees.
//!
//! Implement only the callbacks you need; the rest default to no-ops. [`walk_filter`]
//! drives the visitor in preorder with an explicit stack, so arbitrarily deep filters
//! do not grow the call stack.

use crate::logical::{Expr, Filter, InOp, Op};
use polyplan_types::Value;

pub trait FilterVisitor {
    fn visit_value(&mut self, _path: &str, _op: Op, _value: &Value) {}

    fn visit_path(&mut self, _path_a: &str, _op: Op, _path_b: &str) {}

    fn visit_key(&mut self, _op: Op, _value: i64) {}

    fn visit_expr(&mut self, _left: &Expr, _op: Op, _right: &Expr) {}

    fn visit_in(&mut self, _path: &str, _op: InOp, _values: &[Value]) {}

    fn visit_bool(&mut self, _value: bool) {}

    fn enter_and(&mut self, _children: &[Filter]) {}

    fn enter_or(&mut self, _children: &[Filter]) {}

    fn enter_not(&mut self, _child: &Filter) {}
}

/// Visit every node of `filter` in preorder, children left to right.
pub fn walk_filter<V: FilterVisitor + ?Sized>(filter: &Filter, visitor: &mut V) {
    let mut stack: Vec<&Filter> = vec![filter];
    while let Some(node) = stack.pop() {
        match node {
            Filter::Value { path, op, value } => visitor.visit_value(path, *op, value),
            Filter::Path { path_a, op, path_b } => visitor.visit_path(path_a, *op, path_b),
            Filter::Key { op, value } => visitor.visit_key(*op, *value),
            Filter::Expr { left, op, right } => visitor.visit_expr(left, *op, right),
            Filter::In { path, op, values } => visitor.visit_in(path, *op, values),
            Filter::Bool(value) => visitor.visit_bool(*value),
            Filter::And(children) => {
                visitor.enter_and(children);
                stack.extend(children.iter().rev());
            }
            Filter::Or(children) => {
                visitor.enter_or(children);
                stack.extend(children.iter().rev());
            }
            Filter::Not(child) => {
                visitor.enter_not(child);
                stack.push(child);
            }
        }
    }
}
