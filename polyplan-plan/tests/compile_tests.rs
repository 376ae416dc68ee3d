//! Integration tests for expression and filter compilation.

use std::sync::Arc;

use arrow::datatypes::DataType;
use polyplan_compute::{
    Function, FunctionParams, FunctionRegistry, MappingType, Row, RowEvaluator,
};
use polyplan_expr::{
    ArithmeticOp, Expr, Filter, FunctionExpr, InOp, Op, PredicateExpr, PredicateFunction,
    ScalarExpr, ScalarFunction, TemporalUnit,
};
use polyplan_plan::{CompileContext, CompileOptions, compile_expression, compile_filter};
use polyplan_result::{Error, Result};
use polyplan_test_utils::{init_tracing_for_tests, schema_of, schema_with_key};
use polyplan_types::{BatchSchema, Value};

fn call_depth(expr: &ScalarExpr) -> usize {
    match expr {
        ScalarExpr::Call { args, .. } => 1 + args.iter().map(call_depth).max().unwrap_or(0),
        ScalarExpr::Rename { child, .. } => call_depth(child),
        _ => 1,
    }
}

fn long_schema() -> BatchSchema {
    schema_of(&[("a.b", DataType::Int64), ("c.d", DataType::Int64)])
}

#[test]
fn arithmetic_example_compiles_to_index_tree() {
    init_tracing_for_tests();
    let registry = FunctionRegistry::with_builtins();
    let mut ctx = CompileContext::new(&registry);
    let expr = Expr::binary(
        Expr::path("a.b"),
        ArithmeticOp::Plus,
        Expr::binary(Expr::constant(3i64), ArithmeticOp::Star, Expr::path("c.d")),
    );

    let compiled = compile_expression(&mut ctx, &long_schema(), &expr, false).unwrap();
    let three = Arc::new(Value::Long(3));
    let expected = ScalarExpr::call(
        ScalarFunction::Add,
        vec![
            ScalarExpr::field(0),
            ScalarExpr::call(
                ScalarFunction::Multiply,
                vec![ScalarExpr::literal(three), ScalarExpr::field(1)],
            ),
        ],
    );
    assert_eq!(compiled, expected);

    let aliased = compile_expression(&mut ctx, &long_schema(), &expr, true).unwrap();
    assert_eq!(aliased.alias(), Some("a.b + 3 * c.d"));
}

#[test]
fn missing_and_ambiguous_paths() {
    init_tracing_for_tests();
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let dup = schema_of(&[("dup", DataType::Int64), ("dup", DataType::Int64)]);

    let err = compile_expression(&mut ctx, &dup, &Expr::path("missing"), false).unwrap_err();
    assert!(matches!(err, Error::ColumnNotFound { ref pattern, .. } if pattern == "missing"));

    let err = compile_expression(&mut ctx, &dup, &Expr::path("dup"), false).unwrap_err();
    assert!(matches!(err, Error::AmbiguousColumn { .. }));

    let err = compile_expression(&mut ctx, &dup, &Expr::Key, false).unwrap_err();
    assert!(matches!(err, Error::AmbiguousKey { found: 0, .. }));
}

#[test]
fn identical_literals_share_one_allocation() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let expr = Expr::binary(Expr::constant(5i64), ArithmeticOp::Plus, Expr::constant(5i64));
    let compiled = compile_expression(&mut ctx, &long_schema(), &expr, false).unwrap();
    let ScalarExpr::Call { args, .. } = compiled else {
        panic!("expected call");
    };
    match (&args[0], &args[1]) {
        (ScalarExpr::Literal { value: a, .. }, ScalarExpr::Literal { value: b, .. }) => {
            assert!(Arc::ptr_eq(a, b));
        }
        other => panic!("expected two literals, got {other:?}"),
    }
    assert_eq!(ctx.pool().len(), 1);
}

#[test]
fn long_chains_compile_to_logarithmic_depth() {
    let names: Vec<String> = (0..64).map(|i| format!("c{i}")).collect();
    let columns: Vec<(&str, DataType)> = names
        .iter()
        .map(|name| (name.as_str(), DataType::Int64))
        .collect();
    let schema = schema_of(&columns);
    let ops: Vec<ArithmeticOp> = (0..64)
        .map(|i| {
            if i % 3 == 1 {
                ArithmeticOp::Minus
            } else {
                ArithmeticOp::Plus
            }
        })
        .collect();
    let expr = Expr::multiple(names.iter().map(Expr::path).collect(), ops.clone());

    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let compiled = compile_expression(&mut ctx, &schema, &expr, false).unwrap();
    // 64 leaves -> 6 levels of calls, plus a possible negate, plus the leaf.
    assert!(call_depth(&compiled) <= 8);

    let row: Row = (0..64).map(|i| Some(Value::Long(i * i + 1))).collect();
    let expected: i64 = (0..64i64)
        .zip(&ops)
        .map(|(i, op)| match op {
            ArithmeticOp::Minus => -(i * i + 1),
            _ => i * i + 1,
        })
        .sum();
    assert_eq!(
        RowEvaluator::eval_scalar(&compiled, &row).unwrap(),
        Some(Value::Long(expected))
    );
}

#[test]
fn bracket_renames_only_when_aliased() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let expr = Expr::bracket(
        Expr::binary(Expr::path("a.b"), ArithmeticOp::Minus, Expr::path("c.d")),
        Some("delta".into()),
    );
    let plain = compile_expression(&mut ctx, &long_schema(), &expr, false).unwrap();
    assert_eq!(plain.alias(), None);
    let renamed = compile_expression(&mut ctx, &long_schema(), &expr, true).unwrap();
    match renamed {
        ScalarExpr::Rename { alias, child } => {
            assert_eq!(alias, "delta");
            assert_eq!(*child, plain);
        }
        other => panic!("expected rename, got {other:?}"),
    }
}

#[test]
fn case_when_interleaves_conditions_and_results() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let expr = Expr::case_when(
        vec![
            Filter::value("a.b", Op::Gt, 10i64),
            Filter::value("a.b", Op::Gt, 0i64),
        ],
        vec![Expr::constant("big"), Expr::constant("small")],
        Some(Expr::path("c.d")),
    );
    let compiled = compile_expression(&mut ctx, &long_schema(), &expr, false).unwrap();
    let ScalarExpr::Call { function, args, .. } = &compiled else {
        panic!("expected call, got {compiled:?}");
    };
    assert_eq!(*function, ScalarFunction::CaseWhen);
    assert_eq!(args.len(), 5);
    assert!(matches!(args[0], ScalarExpr::Predicate(_)));
    assert!(matches!(args[2], ScalarExpr::Predicate(_)));
    assert_eq!(args[4], ScalarExpr::field(1));

    let row: Row = vec![Some(Value::Long(3)), Some(Value::Long(-1))];
    assert_eq!(
        RowEvaluator::eval_scalar(&compiled, &row).unwrap(),
        Some(Value::from("small"))
    );

    let bad = Expr::case_when(vec![Filter::Bool(true)], vec![], None);
    assert!(matches!(
        compile_expression(&mut ctx, &long_schema(), &bad, false),
        Err(Error::MalformedInput(_))
    ));
}

#[derive(Debug)]
struct Avg;

impl Function for Avg {
    fn identifier(&self) -> &str {
        "avg"
    }

    fn mapping_type(&self) -> MappingType {
        MappingType::SetMapping
    }

    fn transform(&self, _args: Vec<ScalarExpr>, _params: FunctionParams<'_>) -> Result<ScalarExpr> {
        Err(Error::Internal("set functions are never transformed".into()))
    }
}

#[test]
fn function_calls() {
    let registry = FunctionRegistry::with_builtins();
    registry.register(Arc::new(Avg)).unwrap();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_of(&[("ts", DataType::Int64), ("avg(v)", DataType::Float64)]);

    let extract = Expr::function(
        FunctionExpr::new("extract", vec![Expr::path("ts")]).with_positional("month"),
    );
    let compiled = compile_expression(&mut ctx, &schema, &extract, true).unwrap();
    assert_eq!(
        compiled,
        ScalarExpr::rename(
            "extract(ts, 'month')",
            ScalarExpr::call(
                ScalarFunction::Extract(TemporalUnit::Month),
                vec![ScalarExpr::field(0)]
            )
        )
    );

    // Already-materialized calls resolve to their column.
    let avg = Expr::function(FunctionExpr::new("avg", vec![Expr::path("v")]));
    assert_eq!(
        compile_expression(&mut ctx, &schema, &avg, true).unwrap(),
        ScalarExpr::field_as(1, "avg(v)")
    );

    let avg_other = Expr::function(FunctionExpr::new("avg", vec![Expr::path("ts")]));
    assert!(matches!(
        compile_expression(&mut ctx, &schema, &avg_other, false),
        Err(Error::UnsupportedOperation(_))
    ));

    let distinct = Expr::function(
        FunctionExpr::new("extract", vec![Expr::path("ts")])
            .with_positional("year")
            .with_distinct(true),
    );
    assert!(matches!(
        compile_expression(&mut ctx, &schema, &distinct, false),
        Err(Error::UnsupportedOperation(_))
    ));

    let unknown = Expr::function(FunctionExpr::new("nope", vec![]));
    assert!(matches!(
        compile_expression(&mut ctx, &schema, &unknown, false),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn filter_example_drops_true_and_orders_cheap_first() {
    init_tracing_for_tests();
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_of(&[("x", DataType::Int64), ("y", DataType::Utf8)]);
    let filter = Filter::all_of(vec![
        Filter::value("y", Op::Like, "foo.*"),
        Filter::value("x", Op::Gt, 5i64),
        Filter::Bool(true),
    ]);

    let compiled = compile_filter(&mut ctx, &schema, &filter).unwrap();
    let PredicateExpr::And(children) = &compiled else {
        panic!("expected And, got {compiled:?}");
    };
    assert_eq!(children.len(), 2);
    match &children[0] {
        PredicateExpr::Compare { function, operands } => {
            assert_eq!(*function, PredicateFunction::Greater);
            assert_eq!(operands[0], ScalarExpr::field(0));
        }
        other => panic!("expected numeric compare first, got {other:?}"),
    }
    assert!(matches!(
        &children[1],
        PredicateExpr::Compare { function: PredicateFunction::LikeConst(_), .. }
    ));
}

#[test]
fn fan_out_combines_by_operator_semantics() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_with_key(&[("s.a", DataType::Int64), ("s.b", DataType::Int64)]);

    let any = compile_filter(&mut ctx, &schema, &Filter::value("s.*", Op::Gt, 1i64)).unwrap();
    assert!(matches!(&any, PredicateExpr::Or(children) if children.len() == 2));

    let all = compile_filter(&mut ctx, &schema, &Filter::value("s.*", Op::GtAll, 1i64)).unwrap();
    assert!(matches!(&all, PredicateExpr::And(children) if children.len() == 2));

    // The key is never a fan-out target.
    let star = compile_filter(&mut ctx, &schema, &Filter::value("*", Op::Eq, 1i64)).unwrap();
    assert!(matches!(&star, PredicateExpr::Or(children) if children.len() == 2));

    let missing = compile_filter(&mut ctx, &schema, &Filter::value("t.*", Op::Gt, 1i64));
    assert!(matches!(missing, Err(Error::ColumnNotFound { .. })));
}

#[test]
fn negation_pushes_to_leaves_with_flipped_quantifier() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_of(&[("s.a", DataType::Int64), ("s.b", DataType::Int64)]);
    let filter = Filter::not(Filter::value("s.*", Op::Eq, 1i64));

    let compiled = compile_filter(&mut ctx, &schema, &filter).unwrap();
    let PredicateExpr::And(children) = &compiled else {
        panic!("NOT(any equal) must become all not-equal, got {compiled:?}");
    };
    assert!(children.iter().all(|child| matches!(
        child,
        PredicateExpr::Compare { function: PredicateFunction::NotEqualConst(_), .. }
    )));

    let row: Row = vec![Some(Value::Long(2)), Some(Value::Long(1))];
    assert!(!RowEvaluator::eval_predicate(&compiled, &row).unwrap());
    let row: Row = vec![Some(Value::Long(2)), Some(Value::Long(3))];
    assert!(RowEvaluator::eval_predicate(&compiled, &row).unwrap());
}

#[test]
fn key_path_and_expression_leaves() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_with_key(&[("a", DataType::Int64), ("b", DataType::Int32)]);

    let key = compile_filter(&mut ctx, &schema, &Filter::key(Op::Lt, 100)).unwrap();
    assert_eq!(
        key,
        PredicateExpr::compare(
            PredicateFunction::Less,
            vec![
                ScalarExpr::field(0),
                ScalarExpr::literal(Arc::new(Value::Long(100)))
            ],
        )
    );

    let paths = compile_filter(&mut ctx, &schema, &Filter::paths("a", Op::LtEq, "b")).unwrap();
    assert_eq!(
        paths,
        PredicateExpr::compare(
            PredicateFunction::LessEqual,
            vec![ScalarExpr::field(1), ScalarExpr::field(2)],
        )
    );

    let ambiguous = schema_of(&[("p", DataType::Int64), ("p", DataType::Int64)]);
    assert!(matches!(
        compile_filter(&mut ctx, &ambiguous, &Filter::paths("p", Op::Eq, "p")),
        Err(Error::AmbiguousColumn { .. })
    ));

    let computed = Filter::expr(
        Expr::binary(Expr::path("a"), ArithmeticOp::Plus, Expr::path("b")),
        Op::Eq,
        Expr::constant(10i64),
    );
    let compiled = compile_filter(&mut ctx, &schema, &computed).unwrap();
    let row: Row = vec![Some(Value::Long(0)), Some(Value::Long(7)), Some(Value::Integer(3))];
    assert!(RowEvaluator::eval_predicate(&compiled, &row).unwrap());
}

#[test]
fn in_sets_keep_values_of_the_field_type() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_of(&[("m.i", DataType::Int32), ("m.s", DataType::Utf8)]);
    let filter = Filter::is_in(
        "m.*",
        InOp::InAll,
        vec![Value::Integer(1), Value::from("x"), Value::Long(1)],
    );

    let compiled = compile_filter(&mut ctx, &schema, &filter).unwrap();
    let PredicateExpr::And(children) = &compiled else {
        panic!("expected And, got {compiled:?}");
    };
    let sizes: Vec<usize> = children
        .iter()
        .map(|child| match child {
            PredicateExpr::Compare {
                function: PredicateFunction::InSet(set),
                ..
            } => set.len(),
            other => panic!("expected InSet, got {other:?}"),
        })
        .collect();
    assert_eq!(sizes, vec![1, 1]);

    let unsupported = schema_of(&[("d", DataType::Date32)]);
    assert!(matches!(
        compile_filter(&mut ctx, &unsupported, &Filter::is_in("d", InOp::In, vec![])),
        Err(Error::UnsupportedOperation(_))
    ));
}

#[test]
fn constant_folding_can_be_disabled() {
    let registry = FunctionRegistry::new();
    let options = CompileOptions::default().with_constant_folding(false);
    let mut ctx = CompileContext::with_options(&registry, options);
    let schema = schema_of(&[("s", DataType::Utf8)]);

    let like = Filter::value("s", Op::Like, "a.c");
    let compiled = compile_filter(&mut ctx, &schema, &like).unwrap();
    assert!(matches!(
        &compiled,
        PredicateExpr::Compare { function: PredicateFunction::Like, operands }
            if operands.len() == 2
    ));
    let row: Row = vec![Some(Value::from("abc"))];
    assert!(RowEvaluator::eval_predicate(&compiled, &row).unwrap());

    let like_number = compile_filter(&mut ctx, &schema, &Filter::value("s", Op::Like, 3i64));
    assert!(matches!(like_number, Err(Error::UnsupportedOperation(_))));
}

#[test]
fn like_is_a_full_match_regex() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_of(&[("s", DataType::Utf8)]);
    let matches = |ctx: &mut CompileContext<'_>, op: Op, pattern: &str, text: &str| {
        let compiled = compile_filter(ctx, &schema, &Filter::value("s", op, pattern)).unwrap();
        let row: Row = vec![Some(Value::from(text))];
        RowEvaluator::eval_predicate(&compiled, &row).unwrap()
    };

    assert!(matches(&mut ctx, Op::Like, ".*th", "teeth"));
    assert!(matches(&mut ctx, Op::Like, "^[s|f].*", "south"));
    assert!(!matches(&mut ctx, Op::Like, "th", "teeth"));
    assert!(!matches(&mut ctx, Op::Like, "tee", "teeth"));
    assert!(matches(&mut ctx, Op::NotLike, "tee", "teeth"));
    assert!(!matches(&mut ctx, Op::NotLike, "t.*h", "teeth"));

    let bad = compile_filter(&mut ctx, &schema, &Filter::value("s", Op::Like, "(unclosed"));
    assert!(matches!(bad, Err(Error::UnsupportedOperation(_))));
}

#[test]
fn constant_filters_collapse() {
    let registry = FunctionRegistry::new();
    let mut ctx = CompileContext::new(&registry);
    let schema = schema_of(&[("x", DataType::Int64)]);

    let filter = Filter::any_of(vec![
        Filter::value("x", Op::Eq, 1i64),
        Filter::not(Filter::Bool(false)),
    ]);
    assert_eq!(
        compile_filter(&mut ctx, &schema, &filter).unwrap(),
        PredicateExpr::True
    );
    assert_eq!(
        compile_filter(&mut ctx, &schema, &Filter::all_of(vec![])).unwrap(),
        PredicateExpr::True
    );
    assert_eq!(
        compile_filter(&mut ctx, &schema, &Filter::any_of(vec![])).unwrap(),
        PredicateExpr::False
    );
}
