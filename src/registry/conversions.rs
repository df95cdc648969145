//! Ordered registry of declared type conversions
//!
//! Declared priority is insertion order. Conversions are applied exactly as
//! written; there is no transitive closure.

use std::sync::Arc;

use crate::error::{BuildError, BuildResult, DispatchError, DispatchResult};
use crate::model::Value;
use crate::registry::types::TypeRegistry;

/// A conversion function from one runtime type to another
pub type ConvertFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A declared conversion between two named types
#[derive(Clone)]
pub struct Conversion {
    from: String,
    to: String,
    convert: ConvertFn,
}

impl std::fmt::Debug for Conversion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversion")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

impl Conversion {
    /// Create a conversion triple; names are shape-validated only (the engine
    /// checks them against its type registry on registration)
    pub fn new<F>(from: impl Into<String>, to: impl Into<String>, convert: F) -> BuildResult<Self>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let from = from.into();
        let to = to.into();
        if from.trim().is_empty() || to.trim().is_empty() {
            return Err(BuildError::invalid_argument(
                "conversion 'from' and 'to' must be non-empty type names",
            ));
        }
        Ok(Self {
            from,
            to,
            convert: Arc::new(convert),
        })
    }

    /// Source type name
    pub fn from_type(&self) -> &str {
        &self.from
    }

    /// Target type name
    pub fn to_type(&self) -> &str {
        &self.to
    }

    /// The conversion function
    pub fn convert_fn(&self) -> &ConvertFn {
        &self.convert
    }
}

/// Ordered, append-only sequence of conversions
#[derive(Clone, Default)]
pub struct ConversionRegistry {
    conversions: Vec<Conversion>,
}

impl std::fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.conversions.iter()).finish()
    }
}

impl ConversionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a conversion; priority is insertion order
    pub fn register(&mut self, conversion: Conversion) {
        self.conversions.push(conversion);
    }

    /// Iterate conversions in declared order
    pub fn iter(&self) -> std::slice::Iter<'_, Conversion> {
        self.conversions.iter()
    }

    /// Number of declared conversions
    pub fn len(&self) -> usize {
        self.conversions.len()
    }

    /// Whether no conversions are declared
    pub fn is_empty(&self) -> bool {
        self.conversions.is_empty()
    }

    /// Convert a value to the named target type
    ///
    /// A value already classifying as the target is returned unchanged; the
    /// conversion function is never invoked for it. Otherwise the first
    /// declared `(from == actual, to == target)` conversion applies.
    pub fn convert(
        &self,
        value: &Value,
        target: &str,
        types: &TypeRegistry,
    ) -> DispatchResult<Value> {
        let actual = types.find_type(value)?;
        if actual == target {
            return Ok(value.clone());
        }
        self.conversions
            .iter()
            .find(|conversion| conversion.from == actual && conversion.to == target)
            .map(|conversion| (conversion.convert)(value))
            .ok_or_else(|| DispatchError::NoConversion {
                from: actual.to_string(),
                to: target.to_string(),
            })
    }
}
