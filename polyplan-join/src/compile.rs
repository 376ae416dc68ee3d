//! Join compiler.
//!
//! Turns two input schemas, a [`JoinDescriptor`], and an optional user filter into a
//! [`JoinPlan`]:
//!
//! 1. The user filter is combined with one `Path` equality per declared join column and
//!    extra join prefix.
//! 2. `Path` filters reachable from the root through `And`s only, whose sides resolve
//!    one to each input, are pulled out as equi-keys.
//! 3. Whatever is left is compiled against the concatenated schema as the residual;
//!    equi-keys and residual together form the matcher.
//! 4. The output projection and the execution strategy are derived from the options.

use std::collections::BTreeMap;
use std::fmt;

use polyplan_expr::{Filter, Op, PredicateExpr, PredicateFunction, ScalarExpr, ScalarFunction};
use polyplan_plan::{CompileContext, and_predicates, compile_filter, match_pattern_ignore_key};
use polyplan_result::{Error, Result};
use polyplan_types::{BatchSchema, qualify};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::{JoinAlgorithm, JoinDescriptor, JoinOptions, validate_join_options};

/// Comparison extracted for one `(build index, probe index)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EquiKey {
    pub op: Op,
    /// The filter named the probe column first: the comparison reads
    /// `probe op build` rather than `build op probe`.
    pub reversed: bool,
}

/// How the compiled join should be executed.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinStrategy {
    NestedLoop,
    /// `build_hasher` is evaluated over build rows and `probe_hasher` over probe rows;
    /// only rows with equal hashes are tested against the matcher.
    Hash {
        build_hasher: ScalarExpr,
        probe_hasher: ScalarExpr,
    },
}

/// Output of [`compile_join`].
///
/// Matcher and projection indices address the concatenated row `build ‖ probe`, with
/// the mark column (mark joins only) at `left_field_count + right_field_count`.
#[derive(Clone, Debug, PartialEq)]
pub struct JoinPlan {
    /// Keyed by `(build index, probe index)`, each in its own side's numbering.
    pub equi_keys: BTreeMap<(usize, usize), EquiKey>,
    pub residual: PredicateExpr,
    pub matcher: PredicateExpr,
    pub output_projection: Vec<ScalarExpr>,
    pub strategy: JoinStrategy,
    pub options: JoinOptions,
    pub left_field_count: usize,
    pub right_field_count: usize,
}

impl JoinPlan {
    pub fn algorithm(&self) -> JoinAlgorithm {
        match self.strategy {
            JoinStrategy::NestedLoop => JoinAlgorithm::NestedLoop,
            JoinStrategy::Hash { .. } => JoinAlgorithm::Hash,
        }
    }

    /// Equi-key pairs compared with equality, in key order.
    pub fn equality_keys(&self) -> Vec<(usize, usize)> {
        equality_pairs(&self.equi_keys)
    }
}

impl fmt::Display for JoinPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Join({}) on {} output [",
            self.algorithm(),
            self.options.join_type,
            self.matcher
        )?;
        for (idx, expr) in self.output_projection.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{expr}")?;
        }
        write!(f, "]")
    }
}

/// Compile a join of `left` (build side) and `right` (probe side).
pub fn compile_join(
    ctx: &mut CompileContext<'_>,
    left: &BatchSchema,
    right: &BatchSchema,
    descriptor: &JoinDescriptor,
    filter: Option<&Filter>,
) -> Result<JoinPlan> {
    validate_join_options(&descriptor.options)?;

    let union = union_filter(left, right, descriptor, filter)?;
    let mut equi_keys = BTreeMap::new();
    let remaining = extract_equi_keys(union, left, right, &mut equi_keys);

    let merged = left.merge(right);
    let residual = compile_filter(ctx, &merged, &remaining)?;
    let matcher = build_matcher(&equi_keys, left.field_count(), residual.clone());
    let output_projection = output_projection(left, right, descriptor, &equi_keys);
    let strategy = choose_strategy(descriptor.options.algorithm, &equi_keys)?;

    let plan = JoinPlan {
        equi_keys,
        residual,
        matcher,
        output_projection,
        strategy,
        options: descriptor.options.clone(),
        left_field_count: left.field_count(),
        right_field_count: right.field_count(),
    };
    debug!(
        join_type = %plan.options.join_type,
        algorithm = %plan.algorithm(),
        equi_keys = plan.equi_keys.len(),
        outputs = plan.output_projection.len(),
        "compiled join"
    );
    trace!(plan = %plan, "join plan");
    Ok(plan)
}

fn union_filter(
    left: &BatchSchema,
    right: &BatchSchema,
    descriptor: &JoinDescriptor,
    filter: Option<&Filter>,
) -> Result<Filter> {
    let mut conjuncts = Vec::with_capacity(
        1 + descriptor.extra_join_prefixes.len() + descriptor.join_columns.len(),
    );
    if let Some(filter) = filter {
        conjuncts.push(filter.clone());
    }

    let extra = descriptor
        .extra_join_prefixes
        .iter()
        .map(|prefix| (prefix.clone(), prefix.clone()));
    let declared = descriptor.join_columns.iter().map(|column| {
        (
            qualify(descriptor.prefix_a.as_deref(), column),
            qualify(descriptor.prefix_b.as_deref(), column),
        )
    });
    for (path_a, path_b) in extra.chain(declared) {
        if match_pattern_ignore_key(left, &path_a).is_empty() {
            return Err(Error::column_not_found(path_a, left.names()));
        }
        if match_pattern_ignore_key(right, &path_b).is_empty() {
            return Err(Error::column_not_found(path_b, right.names()));
        }
        conjuncts.push(Filter::paths(path_a, Op::Eq, path_b));
    }
    Ok(Filter::all_of(conjuncts))
}

/// Pull equi-keys out of the top-level conjuncts of `filter`, returning the rest.
///
/// Extracted `Path` filters become empty `And`s. A pair already extracted with a
/// different comparison stays in place and is checked by the residual.
fn extract_equi_keys(
    filter: Filter,
    left: &BatchSchema,
    right: &BatchSchema,
    keys: &mut BTreeMap<(usize, usize), EquiKey>,
) -> Filter {
    match filter {
        Filter::And(children) => Filter::And(
            children
                .into_iter()
                .map(|child| extract_equi_keys(child, left, right, keys))
                .collect(),
        ),
        Filter::Bool(true) => Filter::all_of(Vec::new()),
        Filter::Bool(false) => Filter::any_of(Vec::new()),
        Filter::Path { path_a, op, path_b } => {
            let Some((pair, key)) = locate_path_pair(&path_a, op, &path_b, left, right) else {
                return Filter::Path { path_a, op, path_b };
            };
            match keys.get(&pair) {
                Some(existing) if *existing != key => Filter::Path { path_a, op, path_b },
                _ => {
                    trace!(
                        build = pair.0,
                        probe = pair.1,
                        op = %op,
                        reversed = key.reversed,
                        "extracted equi-key"
                    );
                    keys.insert(pair, key);
                    Filter::all_of(Vec::new())
                }
            }
        }
        other => other,
    }
}

fn locate_path_pair(
    path_a: &str,
    op: Op,
    path_b: &str,
    left: &BatchSchema,
    right: &BatchSchema,
) -> Option<((usize, usize), EquiKey)> {
    if let ([l], [r]) = (
        match_pattern_ignore_key(left, path_a).as_slice(),
        match_pattern_ignore_key(right, path_b).as_slice(),
    ) {
        return Some(((*l, *r), EquiKey { op, reversed: false }));
    }
    if let ([l], [r]) = (
        match_pattern_ignore_key(left, path_b).as_slice(),
        match_pattern_ignore_key(right, path_a).as_slice(),
    ) {
        return Some(((*l, *r), EquiKey { op, reversed: true }));
    }
    None
}

fn build_matcher(
    keys: &BTreeMap<(usize, usize), EquiKey>,
    left_count: usize,
    residual: PredicateExpr,
) -> PredicateExpr {
    let comparisons = keys.iter().map(|(&(l, r), key)| {
        let build = ScalarExpr::field(l);
        let probe = ScalarExpr::field(r + left_count);
        let operands = if key.reversed {
            vec![probe, build]
        } else {
            vec![build, probe]
        };
        PredicateExpr::compare(PredicateFunction::from_op(key.op), operands)
    });
    and_predicates(comparisons.chain(std::iter::once(residual)))
}

fn output_projection(
    left: &BatchSchema,
    right: &BatchSchema,
    descriptor: &JoinDescriptor,
    keys: &BTreeMap<(usize, usize), EquiKey>,
) -> Vec<ScalarExpr> {
    let options = &descriptor.options;
    let join_type = options.join_type;
    let left_count = left.field_count();
    let right_count = right.field_count();

    // Natural-join dedup: a build column equated with a probe column of the same name.
    let same_name_equal: FxHashSet<&str> = keys
        .iter()
        .filter(|(_, key)| key.op.is_equality())
        .filter_map(|(&(l, r), _)| {
            let name = left.name(l)?;
            (right.name(r) == Some(name)).then_some(name)
        })
        .collect();

    let build_join_columns: FxHashSet<String> = descriptor
        .join_columns
        .iter()
        .map(|column| qualify(descriptor.prefix_a.as_deref(), column))
        .collect();
    let probe_join_columns: FxHashSet<String> = descriptor
        .join_columns
        .iter()
        .map(|column| qualify(descriptor.prefix_b.as_deref(), column))
        .collect();

    let cut_probe_side = join_type.emits_build_data()
        && join_type.emits_build_unmatched()
        && !join_type.emits_probe_unmatched();

    let mut outputs = Vec::with_capacity(left_count + right_count + 1);
    if !options.emit_build_side_key
        && let Some(right_key) = right.key_index()
    {
        outputs.push(ScalarExpr::field(left_count + right_key));
    }

    if join_type.emits_build_data() {
        side_outputs(
            &mut outputs,
            0,
            left,
            descriptor.prefix_a.as_deref(),
            options.emit_build_side_key,
            |name| {
                same_name_equal.contains(name)
                    || (!cut_probe_side && build_join_columns.contains(name))
            },
        );
    }

    side_outputs(
        &mut outputs,
        left_count,
        right,
        descriptor.prefix_b.as_deref(),
        options.emit_build_side_key,
        |name| cut_probe_side && probe_join_columns.contains(name),
    );

    if join_type.is_mark()
        && let Some(mark) = options.mark_column.as_deref()
    {
        let field = ScalarExpr::field_as(left_count + right_count, mark);
        outputs.push(if join_type.is_anti_mark() {
            ScalarExpr::Call {
                function: ScalarFunction::Not,
                args: vec![field],
                alias: Some(mark.to_string()),
            }
        } else {
            field
        });
    }
    outputs
}

fn side_outputs(
    outputs: &mut Vec<ScalarExpr>,
    offset: usize,
    schema: &BatchSchema,
    prefix: Option<&str>,
    emit_key: bool,
    skip: impl Fn(&str) -> bool,
) {
    for (idx, name) in schema.names().enumerate() {
        if schema.is_key(idx) {
            if let Some(prefix) = prefix
                && emit_key
            {
                outputs.push(ScalarExpr::field_as(offset + idx, qualify(Some(prefix), name)));
            }
            continue;
        }
        if skip(name) {
            continue;
        }
        outputs.push(ScalarExpr::field(offset + idx));
    }
}

fn equality_pairs(keys: &BTreeMap<(usize, usize), EquiKey>) -> Vec<(usize, usize)> {
    keys.iter()
        .filter(|(_, key)| key.op.is_equality())
        .map(|(pair, _)| *pair)
        .collect()
}

fn choose_strategy(
    algorithm: JoinAlgorithm,
    keys: &BTreeMap<(usize, usize), EquiKey>,
) -> Result<JoinStrategy> {
    match algorithm {
        JoinAlgorithm::NestedLoop => Ok(JoinStrategy::NestedLoop),
        JoinAlgorithm::Hash => {
            let pairs = equality_pairs(keys);
            if pairs.is_empty() {
                return Err(Error::unsupported(
                    "hash join needs at least one equality key; use the nested loop algorithm",
                ));
            }
            let (build, probe): (Vec<ScalarExpr>, Vec<ScalarExpr>) = pairs
                .into_iter()
                .map(|(l, r)| (ScalarExpr::field(l), ScalarExpr::field(r)))
                .unzip();
            Ok(JoinStrategy::Hash {
                build_hasher: ScalarExpr::call(ScalarFunction::Hash, build),
                probe_hasher: ScalarExpr::call(ScalarFunction::Hash, probe),
            })
        }
    }
}
