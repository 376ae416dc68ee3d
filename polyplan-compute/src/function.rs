//! Function catalog consulted by the expression compiler.
//!
//! A [`Function`] knows how to turn its compiled argument expressions into a physical
//! [`ScalarExpr`]. Only row-mapping functions can appear in scalar expressions; set
//! mappings and general mappings are planned by other operators.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use polyplan_expr::ScalarExpr;
use polyplan_result::{Error, Result};
use polyplan_types::Value;
use rustc_hash::FxHashMap;

use crate::extract::Extract;

/// Shape of a function's input/output relationship.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MappingType {
    /// One output value per input row.
    RowMapping,
    /// One output value per input set (aggregates).
    SetMapping,
    /// Arbitrary table-to-table transform.
    Mapping,
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingType::RowMapping => write!(f, "ROW_MAPPING"),
            MappingType::SetMapping => write!(f, "SET_MAPPING"),
            MappingType::Mapping => write!(f, "MAPPING"),
        }
    }
}

/// Non-expression arguments of a call site.
#[derive(Clone, Copy, Debug)]
pub struct FunctionParams<'a> {
    pub positional: &'a [Value],
    pub named: &'a BTreeMap<String, Value>,
}

impl<'a> FunctionParams<'a> {
    pub fn new(positional: &'a [Value], named: &'a BTreeMap<String, Value>) -> Self {
        Self { positional, named }
    }

    /// Positional argument `index`, falling back to the named argument `name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&'a Value> {
        self.positional.get(index).or_else(|| self.named.get(name))
    }
}

/// A function that can be referenced from logical expressions.
pub trait Function: Send + Sync + fmt::Debug {
    /// Name the function is registered and looked up under.
    fn identifier(&self) -> &str;

    fn mapping_type(&self) -> MappingType;

    /// Build the physical expression for one call site.
    ///
    /// `args` are the call's argument expressions, already compiled without aliases.
    fn transform(&self, args: Vec<ScalarExpr>, params: FunctionParams<'_>) -> Result<ScalarExpr>;
}

/// Lookup interface the compiler uses to resolve function names.
pub trait FunctionCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Function>>;
}

/// Thread-safe, mutable function catalog.
///
/// Names are case-insensitive. Lookups take a shared lock, so many compilations can
/// read the registry concurrently.
#[derive(Default)]
pub struct FunctionRegistry {
    functions: RwLock<FxHashMap<String, Arc<dyn Function>>>,
}

impl FunctionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry preloaded with the builtin row functions.
    pub fn with_builtins() -> Self {
        let mut functions: FxHashMap<String, Arc<dyn Function>> = FxHashMap::default();
        let extract: Arc<dyn Function> = Arc::new(Extract);
        functions.insert(extract.identifier().to_ascii_lowercase(), extract);
        Self {
            functions: RwLock::new(functions),
        }
    }

    /// Register `function`, replacing any function with the same name.
    pub fn register(&self, function: Arc<dyn Function>) -> Result<()> {
        let name = function.identifier().to_ascii_lowercase();
        if name.is_empty() {
            return Err(Error::malformed("function identifier must not be empty"));
        }
        let mut guard = self
            .functions
            .write()
            .map_err(|_| Error::Internal("function registry lock poisoned".into()))?;
        guard.insert(name, function);
        Ok(())
    }

    /// Remove a function by name, returning it if it was registered.
    pub fn unregister(&self, name: &str) -> Result<Option<Arc<dyn Function>>> {
        let mut guard = self
            .functions
            .write()
            .map_err(|_| Error::Internal("function registry lock poisoned".into()))?;
        Ok(guard.remove(&name.to_ascii_lowercase()))
    }

    pub fn len(&self) -> usize {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FunctionCatalog for FunctionRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name.to_ascii_lowercase())
            .cloned()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<&String> = guard.keys().collect();
        names.sort();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polyplan_expr::ScalarFunction;

    #[derive(Debug)]
    struct Count;

    impl Function for Count {
        fn identifier(&self) -> &str {
            "count"
        }

        fn mapping_type(&self) -> MappingType {
            MappingType::SetMapping
        }

        fn transform(
            &self,
            _args: Vec<ScalarExpr>,
            _params: FunctionParams<'_>,
        ) -> Result<ScalarExpr> {
            Err(Error::unsupported("count is not a row function"))
        }
    }

    #[test]
    fn builtins_include_extract() {
        let registry = FunctionRegistry::with_builtins();
        let extract = registry.lookup("EXTRACT").expect("extract registered");
        assert_eq!(extract.mapping_type(), MappingType::RowMapping);

        let named = BTreeMap::new();
        let positional = [Value::from("year")];
        let expr = extract
            .transform(
                vec![ScalarExpr::field(0)],
                FunctionParams::new(&positional, &named),
            )
            .unwrap();
        assert!(matches!(
            expr,
            ScalarExpr::Call {
                function: ScalarFunction::Extract(_),
                ..
            }
        ));
    }

    #[test]
    fn register_and_unregister() {
        let registry = FunctionRegistry::new();
        assert!(registry.is_empty());
        registry.register(Arc::new(Count)).unwrap();
        assert!(registry.lookup("Count").is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.unregister("COUNT").unwrap().is_some());
        assert!(registry.lookup("count").is_none());
    }

    #[test]
    fn params_fall_back_to_named() {
        let mut named = BTreeMap::new();
        named.insert("field".to_string(), Value::from("day"));
        let params = FunctionParams::new(&[], &named);
        assert_eq!(params.get(0, "field"), Some(&Value::from("day")));
        assert_eq!(params.get(0, "other"), None);
    }
}
