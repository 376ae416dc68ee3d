//! Expression compiler: logical [`Expr`] to physical [`ScalarExpr`].
//!
//! Every path is bound to a field index of the input schema, constants are interned in
//! the context's literal pool, and function calls are expanded through the catalog.
//! When `want_alias` is set, the root of the result carries the logical expression's
//! column name as its output alias; operands are always compiled without aliases.

use polyplan_compute::{FunctionParams, MappingType};
use polyplan_expr::{ArithmeticOp, CaseWhenExpr, Expr, FunctionExpr, ScalarExpr, ScalarFunction};
use polyplan_result::{Error, Result};
use polyplan_types::{BatchSchema, KEY_COLUMN_NAME};
use tracing::trace;

use crate::context::CompileContext;
use crate::filter::compile_filter;
use crate::resolver::{expect_unique, match_exact_ignore_key, match_pattern_ignore_key, resolve_key};

/// Compile `expr` against `schema`.
pub fn compile_expression(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    expr: &Expr,
    want_alias: bool,
) -> Result<ScalarExpr> {
    let compiled = compile(ctx, schema, expr, want_alias)?;
    trace!(expr = %expr, compiled = %compiled, "compiled expression");
    Ok(compiled)
}

fn compile(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    expr: &Expr,
    want_alias: bool,
) -> Result<ScalarExpr> {
    let alias = || want_alias.then(|| expr.column_name());
    match expr {
        Expr::Path(path) => {
            let index = expect_unique(schema, path, match_pattern_ignore_key(schema, path))?;
            Ok(ScalarExpr::Field {
                index,
                alias: want_alias.then(|| path.clone()),
            })
        }
        Expr::Key => {
            let index = resolve_key(schema)?;
            Ok(ScalarExpr::Field {
                index,
                alias: want_alias.then(|| KEY_COLUMN_NAME.to_string()),
            })
        }
        Expr::Constant(value) => Ok(ScalarExpr::Literal {
            value: ctx.literal(value),
            alias: alias(),
        }),
        Expr::Binary { op, left, right } => {
            let left = compile(ctx, schema, left, false)?;
            let right = compile(ctx, schema, right, false)?;
            Ok(ScalarExpr::Call {
                function: arithmetic_function(*op),
                args: vec![left, right],
                alias: alias(),
            })
        }
        Expr::Unary { op, operand } => compile_unary(ctx, schema, expr, *op, operand, want_alias),
        Expr::Bracket { inner, .. } => {
            let child = compile(ctx, schema, inner, false)?;
            Ok(match alias() {
                Some(name) => ScalarExpr::rename(name, child),
                None => child,
            })
        }
        Expr::CaseWhen(case) => {
            let args = compile_case_when(ctx, schema, case)?;
            Ok(ScalarExpr::Call {
                function: ScalarFunction::CaseWhen,
                args,
                alias: alias(),
            })
        }
        Expr::Function(func) => compile_function(ctx, schema, expr, func, want_alias),
        Expr::Multiple { children, ops } => {
            compile_multiple(ctx, schema, expr, children, ops, want_alias)
        }
    }
}

fn arithmetic_function(op: ArithmeticOp) -> ScalarFunction {
    match op {
        ArithmeticOp::Plus => ScalarFunction::Add,
        ArithmeticOp::Minus => ScalarFunction::Minus,
        ArithmeticOp::Star => ScalarFunction::Multiply,
        ArithmeticOp::Div => ScalarFunction::Ratio,
        ArithmeticOp::Mod => ScalarFunction::Mod,
    }
}

fn compile_unary(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    expr: &Expr,
    op: ArithmeticOp,
    operand: &Expr,
    want_alias: bool,
) -> Result<ScalarExpr> {
    match op {
        ArithmeticOp::Plus => compile(ctx, schema, operand, want_alias),
        ArithmeticOp::Minus => {
            let child = compile(ctx, schema, operand, false)?;
            Ok(ScalarExpr::Call {
                function: ScalarFunction::Negate,
                args: vec![child],
                alias: want_alias.then(|| expr.column_name()),
            })
        }
        other => Err(Error::unsupported(format_args!("unary operator '{other}'"))),
    }
}

fn compile_case_when(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    case: &CaseWhenExpr,
) -> Result<Vec<ScalarExpr>> {
    if case.conditions.len() != case.results.len() {
        return Err(Error::malformed(format_args!(
            "CASE WHEN has {} conditions but {} results",
            case.conditions.len(),
            case.results.len()
        )));
    }
    let mut args = Vec::with_capacity(case.conditions.len() * 2 + 1);
    for (condition, result) in case.conditions.iter().zip(&case.results) {
        let predicate = compile_filter(ctx, schema, condition)?;
        args.push(ScalarExpr::Predicate(Box::new(predicate)));
        args.push(compile(ctx, schema, result, false)?);
    }
    if let Some(else_result) = &case.else_result {
        args.push(compile(ctx, schema, else_result, false)?);
    }
    Ok(args)
}

fn compile_function(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    expr: &Expr,
    func: &FunctionExpr,
    want_alias: bool,
) -> Result<ScalarExpr> {
    // A function already materialized upstream appears as a column named after the call.
    let column_name = expr.column_name();
    let precomputed = match_exact_ignore_key(schema, &column_name);
    if !precomputed.is_empty() {
        let index = expect_unique(schema, &column_name, precomputed)?;
        return Ok(ScalarExpr::Field {
            index,
            alias: want_alias.then_some(column_name),
        });
    }

    if func.distinct {
        return Err(Error::unsupported(format_args!(
            "DISTINCT in row function '{}'",
            func.name
        )));
    }
    let function = ctx
        .catalog()
        .lookup(&func.name)
        .ok_or_else(|| Error::unsupported(format_args!("unknown function '{}'", func.name)))?;
    if function.mapping_type() != MappingType::RowMapping {
        return Err(Error::unsupported(format_args!(
            "function '{}' is {}, only ROW_MAPPING functions are allowed in expressions",
            func.name,
            function.mapping_type()
        )));
    }

    let mut args = Vec::with_capacity(func.args.len());
    for arg in &func.args {
        args.push(compile(ctx, schema, arg, false)?);
    }
    let compiled = function.transform(args, FunctionParams::new(&func.positional, &func.named))?;
    Ok(if want_alias {
        ScalarExpr::rename(column_name, compiled)
    } else {
        compiled
    })
}

/// A term of a flattened `+`/`-` chain with its effective sign.
struct SignedTerm<'e> {
    negative: bool,
    expr: &'e Expr,
}

fn compile_multiple(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    expr: &Expr,
    children: &[Expr],
    ops: &[ArithmeticOp],
    want_alias: bool,
) -> Result<ScalarExpr> {
    if children.is_empty() {
        return Err(Error::malformed("empty arithmetic chain"));
    }
    if children.len() != ops.len() {
        return Err(Error::malformed(format_args!(
            "arithmetic chain has {} terms but {} operators",
            children.len(),
            ops.len()
        )));
    }
    if let Some(bad) = ops
        .iter()
        .find(|op| !matches!(op, ArithmeticOp::Plus | ArithmeticOp::Minus))
    {
        return Err(Error::malformed(format_args!(
            "operator '{bad}' in additive chain"
        )));
    }
    if children.len() == 1 {
        return compile_unary(ctx, schema, expr, ops[0], &children[0], want_alias);
    }

    let terms: Vec<SignedTerm<'_>> = children
        .iter()
        .zip(ops)
        .map(|(expr, op)| SignedTerm {
            negative: *op == ArithmeticOp::Minus,
            expr,
        })
        .collect();
    let balanced = build_balanced(ctx, schema, &terms, false)?;
    Ok(if want_alias {
        balanced.with_alias(expr.column_name())
    } else {
        balanced
    })
}

/// Compile `Σ ±terms` as a balanced tree. With `flip`, every sign is inverted.
///
/// A right subtree whose first term is negative is attached with `Minus` and built
/// with its signs inverted, so `a - b - c - d` becomes `(a - b) - (c + d)`.
fn build_balanced(
    ctx: &mut CompileContext<'_>,
    schema: &BatchSchema,
    terms: &[SignedTerm<'_>],
    flip: bool,
) -> Result<ScalarExpr> {
    match terms {
        [] => Err(Error::Internal("balanced chain over no terms".into())),
        [term] => {
            let compiled = compile(ctx, schema, term.expr, false)?;
            Ok(if term.negative != flip {
                ScalarExpr::call(ScalarFunction::Negate, vec![compiled])
            } else {
                compiled
            })
        }
        _ => {
            let mid = terms.len().div_ceil(2);
            let (left_terms, right_terms) = terms.split_at(mid);
            let left = build_balanced(ctx, schema, left_terms, flip)?;
            let right_negative = right_terms[0].negative != flip;
            let (function, right_flip) = if right_negative {
                (ScalarFunction::Minus, !flip)
            } else {
                (ScalarFunction::Add, flip)
            };
            let right = build_balanced(ctx, schema, right_terms, right_flip)?;
            Ok(ScalarExpr::call(function, vec![left, right]))
        }
    }
}
