//! Reference join executors.
//!
//! These interpret a [`JoinPlan`] row by row over Arrow record batches. They exist to
//! check compiled plans (for example, that both strategies produce the same rows), not
//! to be fast.
//!
//! Output rows are the plan's output projection evaluated over the concatenated row
//! `build ‖ probe`, with NULLs standing in for the missing side of an unmatched row.
//! Mark joins emit one row per probe row with the mark cell appended after both sides.

use arrow::record_batch::RecordBatch;
use polyplan_compute::{Datum, Row, RowEvaluator, batch_rows};
use polyplan_expr::ScalarExpr;
use polyplan_result::{Error, Result};
use polyplan_types::Value;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::compile::{JoinPlan, JoinStrategy};

/// Run `plan` with the executor matching its strategy.
pub fn execute_join(
    plan: &JoinPlan,
    left: &[RecordBatch],
    right: &[RecordBatch],
) -> Result<Vec<Row>> {
    match plan.strategy {
        JoinStrategy::NestedLoop => nested_loop_join(plan, left, right),
        JoinStrategy::Hash { .. } => hash_join(plan, left, right),
    }
}

/// Test every probe row against every build row.
///
/// Valid for any plan; the hash strategy's hashers are ignored.
pub fn nested_loop_join(
    plan: &JoinPlan,
    left: &[RecordBatch],
    right: &[RecordBatch],
) -> Result<Vec<Row>> {
    let build_rows = read_side(left, plan.left_field_count, "build")?;
    let probe_rows = read_side(right, plan.right_field_count, "probe")?;
    let candidates: Vec<usize> = (0..build_rows.len()).collect();

    let mut state = JoinState::new(plan, build_rows);
    for probe in &probe_rows {
        state.probe(probe, &candidates)?;
    }
    let output = state.finish()?;
    debug!(
        build = candidates.len(),
        probe = probe_rows.len(),
        output = output.len(),
        "nested loop join"
    );
    Ok(output)
}

/// Bucket build rows by the build hasher and test each probe row only against the
/// bucket its probe hash selects.
pub fn hash_join(plan: &JoinPlan, left: &[RecordBatch], right: &[RecordBatch]) -> Result<Vec<Row>> {
    let JoinStrategy::Hash {
        build_hasher,
        probe_hasher,
    } = &plan.strategy
    else {
        return Err(Error::unsupported("hash join over a plan without hashers"));
    };
    let build_rows = read_side(left, plan.left_field_count, "build")?;
    let probe_rows = read_side(right, plan.right_field_count, "probe")?;

    let mut buckets: FxHashMap<i64, Vec<usize>> = FxHashMap::default();
    for (idx, row) in build_rows.iter().enumerate() {
        buckets.entry(hash_of(build_hasher, row)?).or_default().push(idx);
    }
    let bucket_count = buckets.len();

    let mut state = JoinState::new(plan, build_rows);
    for probe in &probe_rows {
        let hash = hash_of(probe_hasher, probe)?;
        let candidates = buckets.get(&hash).map(Vec::as_slice).unwrap_or_default();
        state.probe(probe, candidates)?;
    }
    let output = state.finish()?;
    debug!(
        buckets = bucket_count,
        probe = probe_rows.len(),
        output = output.len(),
        "hash join"
    );
    Ok(output)
}

fn read_side(batches: &[RecordBatch], width: usize, side: &str) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for batch in batches {
        if batch.num_columns() != width {
            return Err(Error::malformed(format_args!(
                "{side} batch has {} columns, plan expects {width}",
                batch.num_columns()
            )));
        }
        rows.extend(batch_rows(batch)?);
    }
    Ok(rows)
}

fn hash_of(hasher: &ScalarExpr, row: &[Datum]) -> Result<i64> {
    match RowEvaluator::eval_scalar(hasher, row)? {
        Some(Value::Long(hash)) => Ok(hash),
        other => Err(Error::Internal(format!(
            "hasher produced {other:?} instead of a 64-bit hash"
        ))),
    }
}

struct JoinState<'p> {
    plan: &'p JoinPlan,
    build_rows: Vec<Row>,
    build_matched: Vec<bool>,
    output: Vec<Row>,
}

impl<'p> JoinState<'p> {
    fn new(plan: &'p JoinPlan, build_rows: Vec<Row>) -> Self {
        let build_matched = vec![false; build_rows.len()];
        Self {
            plan,
            build_rows,
            build_matched,
            output: Vec::new(),
        }
    }

    fn probe(&mut self, probe: &[Datum], candidates: &[usize]) -> Result<()> {
        let plan = self.plan;
        let join_type = plan.options.join_type;
        let mut matched = false;
        let mut combined: Row = Vec::with_capacity(plan.left_field_count + probe.len() + 1);

        for &build_idx in candidates {
            combined.clear();
            combined.extend(self.build_rows[build_idx].iter().cloned());
            combined.extend(probe.iter().cloned());
            if !RowEvaluator::eval_predicate(&plan.matcher, &combined)? {
                continue;
            }
            matched = true;
            self.build_matched[build_idx] = true;
            if !join_type.emits_all_matched() {
                break;
            }
            self.output.push(project(plan, &combined)?);
        }

        if join_type.is_mark() {
            let mut marked = null_row(plan.left_field_count);
            marked.extend(probe.iter().cloned());
            marked.push(Some(Value::Boolean(matched)));
            self.output.push(project(plan, &marked)?);
        } else if !matched && join_type.emits_probe_unmatched() {
            let mut unmatched = null_row(plan.left_field_count);
            unmatched.extend(probe.iter().cloned());
            self.output.push(project(plan, &unmatched)?);
        }
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Row>> {
        let plan = self.plan;
        if plan.options.join_type.emits_build_unmatched() {
            for (row, matched) in self.build_rows.iter().zip(&self.build_matched) {
                if *matched {
                    continue;
                }
                let mut unmatched = row.clone();
                unmatched.extend(null_row(plan.right_field_count));
                self.output.push(project(plan, &unmatched)?);
            }
        }
        Ok(self.output)
    }
}

fn null_row(width: usize) -> Row {
    vec![None; width]
}

fn project(plan: &JoinPlan, row: &[Datum]) -> Result<Row> {
    plan.output_projection
        .iter()
        .map(|expr| RowEvaluator::eval_scalar(expr, row))
        .collect()
}
