//! Per-compilation state shared by every compiler layer.

use std::sync::Arc;

use polyplan_compute::FunctionCatalog;
use polyplan_types::Value;
use rustc_hash::FxHashMap;

/// Deduplicating pool of literal values.
///
/// Equal literals interned through the same pool share one allocation, so a compiled
/// plan never holds two copies of the same constant.
#[derive(Debug, Default)]
pub struct LiteralPool {
    values: FxHashMap<Value, Arc<Value>>,
}

impl LiteralPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pooled instance equal to `value`, inserting it on first use.
    pub fn intern(&mut self, value: &Value) -> Arc<Value> {
        if let Some(existing) = self.values.get(value) {
            return Arc::clone(existing);
        }
        let pooled = Arc::new(value.clone());
        self.values.insert(value.clone(), Arc::clone(&pooled));
        pooled
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Knobs controlling filter compilation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompileOptions {
    /// Sort `And`/`Or` children cheapest first before compiling.
    pub reorder_predicates: bool,
    /// Embed constants into `EqualConst`/`LikeConst`-style predicates instead of
    /// comparing against a literal operand.
    pub fold_constant_predicates: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            reorder_predicates: true,
            fold_constant_predicates: true,
        }
    }
}

impl CompileOptions {
    pub fn with_reorder_predicates(mut self, enabled: bool) -> Self {
        self.reorder_predicates = enabled;
        self
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.fold_constant_predicates = enabled;
        self
    }
}

/// State of one compilation: the literal pool, the function catalog, and options.
///
/// A context is owned by a single compile call chain and passed down as `&mut`.
pub struct CompileContext<'a> {
    pool: LiteralPool,
    catalog: &'a dyn FunctionCatalog,
    options: CompileOptions,
}

impl<'a> CompileContext<'a> {
    pub fn new(catalog: &'a dyn FunctionCatalog) -> Self {
        Self::with_options(catalog, CompileOptions::default())
    }

    pub fn with_options(catalog: &'a dyn FunctionCatalog, options: CompileOptions) -> Self {
        Self {
            pool: LiteralPool::new(),
            catalog,
            options,
        }
    }

    pub fn catalog(&self) -> &'a dyn FunctionCatalog {
        self.catalog
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn pool(&self) -> &LiteralPool {
        &self.pool
    }

    /// Intern `value` in this compilation's literal pool.
    pub fn literal(&mut self, value: &Value) -> Arc<Value> {
        self.pool.intern(value)
    }
}
