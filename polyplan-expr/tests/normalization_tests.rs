use polyplan_expr::traversal::fold_postorder;
use polyplan_expr::{
    ArithmeticOp, Expr, Filter, FilterVisitor, InOp, Op, complexity, contains_not, push_not,
    reorder, walk_filter,
};
use polyplan_types::Value;

fn mixed_filter() -> Filter {
    Filter::any_of(vec![
        Filter::not(Filter::all_of(vec![
            Filter::value("a", Op::Gt, 1i64),
            Filter::not(Filter::value("s", Op::Like, "x.*")),
        ])),
        Filter::not(Filter::not(Filter::is_in(
            "b",
            InOp::NotIn,
            vec![Value::Long(1), Value::Long(2)],
        ))),
        Filter::not(Filter::key(Op::Eq, 9)),
        Filter::paths("a", Op::LtEq, "b"),
    ])
}

#[test]
fn push_not_removes_every_not() {
    let filter = mixed_filter();
    assert!(contains_not(&filter));
    let pushed = push_not(filter);
    assert!(!contains_not(&pushed));
}

#[test]
fn push_not_is_idempotent() {
    let once = push_not(mixed_filter());
    let twice = push_not(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn push_not_applies_de_morgan_and_flips_quantifiers() {
    let pushed = push_not(mixed_filter());
    let expected = Filter::any_of(vec![
        Filter::any_of(vec![
            Filter::value("a", Op::LtEqAll, 1i64),
            Filter::value("s", Op::Like, "x.*"),
        ]),
        Filter::is_in("b", InOp::NotIn, vec![Value::Long(1), Value::Long(2)]),
        Filter::key(Op::NotEqAll, 9),
        Filter::paths("a", Op::LtEq, "b"),
    ]);
    assert_eq!(pushed, expected);
}

#[test]
fn opposite_is_an_involution() {
    let ops = [
        Op::Eq,
        Op::NotEq,
        Op::Gt,
        Op::GtEq,
        Op::Lt,
        Op::LtEq,
        Op::Like,
        Op::NotLike,
        Op::EqAll,
        Op::NotEqAll,
        Op::GtAll,
        Op::GtEqAll,
        Op::LtAll,
        Op::LtEqAll,
        Op::LikeAll,
        Op::NotLikeAll,
    ];
    for op in ops {
        assert_eq!(op.opposite().opposite(), op, "{op}");
        assert_ne!(op.is_or_op(), op.opposite().is_or_op(), "{op}");
    }
    for op in [InOp::In, InOp::NotIn, InOp::InAll, InOp::NotInAll] {
        assert_eq!(op.opposite().opposite(), op, "{op}");
        assert_ne!(op.is_not_op(), op.opposite().is_not_op(), "{op}");
    }
}

#[test]
fn negated_constants_flip() {
    assert_eq!(push_not(Filter::not(Filter::Bool(true))), Filter::Bool(false));
    assert_eq!(
        push_not(Filter::not(Filter::all_of(vec![]))),
        Filter::any_of(vec![])
    );
}

#[test]
fn reorder_moves_expensive_leaves_last_and_is_stable() {
    let filter = Filter::all_of(vec![
        Filter::value("s", Op::Eq, "text"),
        Filter::value("a", Op::Gt, 1i64),
        Filter::expr(
            Expr::binary(Expr::path("a"), ArithmeticOp::Plus, Expr::path("b")),
            Op::Eq,
            Expr::constant(3i64),
        ),
        Filter::value("b", Op::Lt, 5i64),
        Filter::any_of(vec![
            Filter::value("t", Op::Like, "a.*"),
            Filter::value("u", Op::Like, "b.*"),
        ]),
    ]);
    let Filter::And(children) = reorder(filter) else {
        panic!("reorder must keep the root connective");
    };
    let scores: Vec<usize> = children.iter().map(complexity).collect();
    assert_eq!(scores, vec![0, 0, 1, 1, 2]);
    assert!(matches!(&children[0], Filter::Value { path, .. } if path == "a"));
    assert!(matches!(&children[1], Filter::Value { path, .. } if path == "b"));
    assert!(matches!(&children[2], Filter::Value { path, .. } if path == "s"));
    assert!(matches!(&children[3], Filter::Expr { .. }));
}

#[test]
fn reorder_is_idempotent() {
    let once = reorder(push_not(mixed_filter()));
    assert_eq!(reorder(once.clone()), once);
}

#[derive(Default)]
struct PathCollector {
    paths: Vec<String>,
    connectives: usize,
}

impl FilterVisitor for PathCollector {
    fn visit_value(&mut self, path: &str, _op: Op, _value: &Value) {
        self.paths.push(path.to_string());
    }

    fn visit_in(&mut self, path: &str, _op: InOp, _values: &[Value]) {
        self.paths.push(path.to_string());
    }

    fn enter_and(&mut self, _children: &[Filter]) {
        self.connectives += 1;
    }

    fn enter_or(&mut self, _children: &[Filter]) {
        self.connectives += 1;
    }
}

#[test]
fn visitor_walks_in_preorder() {
    let mut collector = PathCollector::default();
    walk_filter(&mixed_filter(), &mut collector);
    assert_eq!(collector.paths, vec!["a", "s", "b"]);
    assert_eq!(collector.connectives, 2);
    let leaves = fold_postorder(&mixed_filter(), |node, below: Vec<usize>| {
        Ok(if node.is_leaf() { 1 } else { below.into_iter().sum() })
    });
    assert_eq!(leaves.unwrap(), 5);
}
