//! Ordered registry of named runtime type predicates
//!
//! Order is significant: a lower index means a more specific type, both for
//! value classification ([`TypeRegistry::find_type`] returns the first
//! matching predicate) and for signature ordering. Two structural sentinels,
//! [`OBJECT_TYPE`] and [`ANY_TYPE`], are created with the registry and always
//! remain the last two entries; user registrations are inserted immediately
//! before them.

use std::sync::Arc;

use crate::error::{BuildError, BuildResult, DispatchError, DispatchResult};
use crate::model::Value;

/// Name of the structural object sentinel (second to last in every registry)
pub const OBJECT_TYPE: &str = "object";

/// Name of the structural catch-all sentinel (last in every registry)
pub const ANY_TYPE: &str = "any";

/// A runtime type predicate
pub type TypeTest = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
struct TypeEntry {
    name: String,
    test: TypeTest,
}

/// Ordered sequence of named type predicates plus the ignore set
///
/// Duplicate names are allowed; the first entry wins on lookup.
#[derive(Clone)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
    ignored: Vec<String>,
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names().collect::<Vec<_>>())
            .field("ignored", &self.ignored)
            .finish()
    }
}

impl TypeRegistry {
    /// Create a registry containing only the `object` and `any` sentinels
    pub fn new() -> Self {
        let entries = vec![
            TypeEntry {
                name: OBJECT_TYPE.to_string(),
                test: Arc::new(|value| matches!(value, Value::Object(_))),
            },
            TypeEntry {
                name: ANY_TYPE.to_string(),
                test: Arc::new(|_| true),
            },
        ];
        Self {
            entries,
            ignored: Vec::new(),
        }
    }

    /// Register a named type predicate
    ///
    /// The entry is inserted just before the `object` sentinel, so the
    /// sentinels keep the two largest indices.
    pub fn register<F>(&mut self, name: impl Into<String>, test: F) -> BuildResult<()>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BuildError::invalid_argument(
                "type name must be a non-empty string",
            ));
        }
        self.insert(name, Arc::new(test));
        Ok(())
    }

    fn insert(&mut self, name: String, test: TypeTest) {
        let position = self.entries.len() - 2;
        self.entries.insert(position, TypeEntry { name, test });
    }

    /// Look up the predicate registered under `name`
    pub fn find_test(&self, name: &str) -> BuildResult<TypeTest> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.test.clone())
            .ok_or_else(|| BuildError::unknown_type(name, self.hint_for(name)))
    }

    /// Classify a value: the name of the first predicate that matches it
    ///
    /// The `any` sentinel matches everything, so this only fails on a
    /// registry that somehow lost its sentinels.
    pub fn find_type(&self, value: &Value) -> DispatchResult<&str> {
        self.entries
            .iter()
            .find(|entry| (entry.test)(value))
            .map(|entry| entry.name.as_str())
            .ok_or(DispatchError::UnknownValueType)
    }

    /// Add a type name to the ignore set
    ///
    /// Ignored names are stripped from params during normalization; a param
    /// left empty by stripping invalidates its whole signature.
    pub fn ignore(&mut self, name: impl Into<String>) {
        self.ignored.push(name.into());
    }

    /// Check whether a type name is in the ignore set
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignored.iter().any(|ignored| ignored == name)
    }

    /// Registered type names, in registry order (sentinels last)
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    /// Number of entries, sentinels included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry has no entries (never true for a registry built
    /// through [`TypeRegistry::new`])
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn hint_for(&self, name: &str) -> Option<String> {
        let lowered = name.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.name.to_lowercase() == lowered)
            .map(|entry| entry.name.clone())
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the built-in types, in the documented classification order:
/// `null`, `boolean`, `integer`, `number`, `string`, `array`
///
/// `integer` matches only [`Value::Int`]; `number` matches both [`Value::Int`]
/// and [`Value::Number`]. Because `integer` precedes `number`, integer values
/// classify as `integer` while still satisfying `number` params.
pub fn register_builtin_types(registry: &mut TypeRegistry) {
    registry.insert(
        "null".to_string(),
        Arc::new(|value| matches!(value, Value::Null)),
    );
    registry.insert(
        "boolean".to_string(),
        Arc::new(|value| matches!(value, Value::Bool(_))),
    );
    registry.insert(
        "integer".to_string(),
        Arc::new(|value| matches!(value, Value::Int(_))),
    );
    registry.insert(
        "number".to_string(),
        Arc::new(|value| matches!(value, Value::Int(_) | Value::Number(_))),
    );
    registry.insert(
        "string".to_string(),
        Arc::new(|value| matches!(value, Value::String(_))),
    );
    registry.insert(
        "array".to_string(),
        Arc::new(|value| matches!(value, Value::Array(_))),
    );
}
