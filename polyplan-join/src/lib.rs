//! Join planning: equi-key extraction, residual predicates, output projection, and
//! algorithm selection.
//!
//! This crate exposes the shared join configuration types (`JoinType`, `JoinOptions`,
//! `JoinDescriptor`), the compiler in [`compile_join`] that turns a descriptor plus a
//! filter into a [`JoinPlan`], and reference executors in [`executor`] used to check
//! compiled plans.
#![forbid(unsafe_code)]

mod compile;
pub mod executor;

use std::fmt;

use polyplan_result::{Error, Result};
use polyplan_types::{BatchSchema, strip_qualifier};

pub use compile::{EquiKey, JoinPlan, JoinStrategy, compile_join};
pub use executor::{execute_join, hash_join, nested_loop_join};

/// Join flavor. The left input is the build side, the right input the probe side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum JoinType {
    /// Matching pairs only.
    #[default]
    Inner,
    /// Matching pairs, then every unmatched build row padded with NULLs.
    Left,
    /// Matching pairs, plus every unmatched probe row padded with NULLs.
    Right,
    /// Union of `Left` and `Right` padding.
    Full,
    /// One row per probe row, marked true when some build row matched.
    Semi,
    /// One row per probe row, marked true when no build row matched.
    Anti,
}

impl JoinType {
    pub fn name(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Semi => "SEMI",
            JoinType::Anti => "ANTI",
        }
    }

    pub fn emits_build_data(&self) -> bool {
        !self.is_mark()
    }

    pub fn emits_build_unmatched(&self) -> bool {
        matches!(self, JoinType::Left | JoinType::Full)
    }

    pub fn emits_probe_unmatched(&self) -> bool {
        !matches!(self, JoinType::Inner | JoinType::Left)
    }

    /// Whether every matching pair is emitted, as opposed to one row per probe row.
    pub fn emits_all_matched(&self) -> bool {
        !self.is_mark()
    }

    pub fn is_mark(&self) -> bool {
        matches!(self, JoinType::Semi | JoinType::Anti)
    }

    pub fn is_anti_mark(&self) -> bool {
        *self == JoinType::Anti
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physical strategy a [`JoinPlan`] is compiled for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum JoinAlgorithm {
    /// Test the matcher on every build/probe pair. Accepts any predicate.
    #[default]
    NestedLoop,
    /// Test only pairs whose equality keys hash alike. Needs an extracted equality key.
    Hash,
}

impl JoinAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            JoinAlgorithm::NestedLoop => "NestedLoop",
            JoinAlgorithm::Hash => "Hash",
        }
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Join flavor, strategy, and output knobs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinOptions {
    pub join_type: JoinType,
    pub algorithm: JoinAlgorithm,
    /// Emit each side's key column, aliased `prefix.key`, instead of a single leading
    /// probe key.
    pub emit_build_side_key: bool,
    /// Output name of the mark column for semi/anti joins.
    pub mark_column: Option<String>,
}

impl JoinOptions {
    fn of(join_type: JoinType) -> Self {
        Self {
            join_type,
            ..Self::default()
        }
    }

    pub fn inner() -> Self {
        Self::of(JoinType::Inner)
    }

    pub fn left() -> Self {
        Self::of(JoinType::Left)
    }

    pub fn right() -> Self {
        Self::of(JoinType::Right)
    }

    pub fn full() -> Self {
        Self::of(JoinType::Full)
    }

    /// Semi join whose mark column is named `mark_column`.
    pub fn semi(mark_column: impl Into<String>) -> Self {
        Self::of(JoinType::Semi).with_mark_column(mark_column)
    }

    /// Anti join whose mark column is named `mark_column`.
    pub fn anti(mark_column: impl Into<String>) -> Self {
        Self::of(JoinType::Anti).with_mark_column(mark_column)
    }

    pub fn with_algorithm(self, algorithm: JoinAlgorithm) -> Self {
        Self { algorithm, ..self }
    }

    pub fn with_emit_build_side_key(self, emit_build_side_key: bool) -> Self {
        Self {
            emit_build_side_key,
            ..self
        }
    }

    pub fn with_mark_column(self, name: impl Into<String>) -> Self {
        Self {
            mark_column: Some(name.into()),
            ..self
        }
    }
}

/// Reject option combinations the compiler cannot plan.
pub fn validate_join_options(options: &JoinOptions) -> Result<()> {
    if options.join_type.is_mark() {
        match options.mark_column.as_deref() {
            None => {
                return Err(Error::malformed(format_args!(
                    "{} join requires a mark column name",
                    options.join_type
                )));
            }
            Some("") => return Err(Error::malformed("mark column name must not be empty")),
            Some(_) => {}
        }
    }
    Ok(())
}

/// Everything the join compiler needs besides the input schemas and the user filter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinDescriptor {
    /// Table prefix of the build side columns.
    pub prefix_a: Option<String>,
    /// Table prefix of the probe side columns.
    pub prefix_b: Option<String>,
    /// Column suffixes equated between `prefix_a.c` and `prefix_b.c`.
    pub join_columns: Vec<String>,
    /// Full paths equated with themselves across both sides.
    pub extra_join_prefixes: Vec<String>,
    pub options: JoinOptions,
}

impl JoinDescriptor {
    pub fn new(options: JoinOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn with_prefixes(
        mut self,
        prefix_a: impl Into<String>,
        prefix_b: impl Into<String>,
    ) -> Self {
        self.prefix_a = Some(prefix_a.into());
        self.prefix_b = Some(prefix_b.into());
        self
    }

    pub fn with_join_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.join_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra_join_prefixes<S: Into<String>>(
        mut self,
        prefixes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.extra_join_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }
}

/// Column suffixes present under both prefixes, in build-side order.
///
/// Key fields are ignored. This is how a natural join derives its join columns.
pub fn natural_join_columns(
    left: &BatchSchema,
    right: &BatchSchema,
    prefix_a: Option<&str>,
    prefix_b: Option<&str>,
) -> Vec<String> {
    let right_suffixes: Vec<&str> = right
        .names()
        .enumerate()
        .filter(|(idx, _)| !right.is_key(*idx))
        .filter_map(|(_, name)| strip_qualifier(name, prefix_b))
        .collect();

    let mut columns: Vec<String> = Vec::new();
    for (idx, name) in left.names().enumerate() {
        if left.is_key(idx) {
            continue;
        }
        let Some(suffix) = strip_qualifier(name, prefix_a) else {
            continue;
        };
        if right_suffixes.contains(&suffix) && !columns.iter().any(|c| c == suffix) {
            columns.push(suffix.to_string());
        }
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};
    use polyplan_types::key_field;

    #[test]
    fn test_option_constructors_keep_defaults() {
        let plain = JoinOptions::inner();
        assert_eq!(plain, JoinOptions::default());
        assert_eq!(plain.algorithm, JoinAlgorithm::NestedLoop);

        let tuned = JoinOptions::full()
            .with_emit_build_side_key(true)
            .with_algorithm(JoinAlgorithm::Hash);
        assert_eq!(
            (tuned.join_type, tuned.algorithm, tuned.emit_build_side_key),
            (JoinType::Full, JoinAlgorithm::Hash, true)
        );
        assert_eq!(JoinOptions::anti("&mark").mark_column.as_deref(), Some("&mark"));
    }

    #[test]
    fn test_emit_flags_per_join_type() {
        // (type, build unmatched, probe unmatched, all matched)
        let table = [
            (JoinType::Inner, false, false, true),
            (JoinType::Left, true, false, true),
            (JoinType::Right, false, true, true),
            (JoinType::Full, true, true, true),
            (JoinType::Semi, false, true, false),
            (JoinType::Anti, false, true, false),
        ];
        for (join_type, build, probe, all) in table {
            assert_eq!(join_type.emits_build_unmatched(), build, "{join_type}");
            assert_eq!(join_type.emits_probe_unmatched(), probe, "{join_type}");
            assert_eq!(join_type.emits_all_matched(), all, "{join_type}");
            assert_eq!(join_type.emits_build_data(), !join_type.is_mark());
        }
        assert!(JoinType::Anti.is_anti_mark());
        assert!(!JoinType::Semi.is_anti_mark());
    }

    #[test]
    fn test_mark_joins_need_a_mark_name() {
        let unnamed = JoinOptions {
            join_type: JoinType::Semi,
            ..JoinOptions::default()
        };
        assert!(matches!(
            validate_join_options(&unnamed),
            Err(Error::MalformedInput(_))
        ));
        assert!(validate_join_options(&JoinOptions::anti("")).is_err());
        assert!(validate_join_options(&JoinOptions::semi("hit")).is_ok());
        assert!(validate_join_options(&JoinOptions::right()).is_ok());
    }

    #[test]
    fn test_names_render_upper_case_types() {
        let rendered: Vec<String> = [JoinType::Left, JoinType::Anti]
            .iter()
            .map(ToString::to_string)
            .chain([JoinAlgorithm::NestedLoop.to_string()])
            .collect();
        assert_eq!(rendered, ["LEFT", "ANTI", "NestedLoop"]);
    }

    #[test]
    fn test_natural_join_columns() {
        let left = BatchSchema::from_fields(vec![
            key_field(),
            Field::new("l.id", DataType::Int64, true),
            Field::new("l.val", DataType::Int64, true),
            Field::new("l.name", DataType::Utf8, true),
        ]);
        let right = BatchSchema::from_fields(vec![
            key_field(),
            Field::new("r.name", DataType::Utf8, true),
            Field::new("r.id", DataType::Int64, true),
            Field::new("other.val", DataType::Int64, true),
        ]);
        assert_eq!(
            natural_join_columns(&left, &right, Some("l"), Some("r")),
            vec!["id", "name"]
        );
        assert!(natural_join_columns(&left, &right, None, None).is_empty());
    }
}
