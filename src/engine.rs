//! The dispatch engine: registries plus the public constructor surface
//!
//! An [`Engine`] owns one type registry and one conversion registry and
//! compiles signatures maps into [`TypedFunction`]s against them. A
//! process-wide default engine is available through [`default_engine`] and
//! the free-function conveniences; independent engines are just values.
//!
//! Registries are append-only. A compiled callable closes over the registry
//! state it was built against, so mutating an engine after building has no
//! effect on existing callables.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::compiler::dispatch::{NativeFn, Signatures, TypedFunction, assemble};
use crate::error::{BuildError, BuildResult, DispatchResult};
use crate::model::Value;
use crate::registry::conversions::{Conversion, ConversionRegistry};
use crate::registry::types::{TypeRegistry, register_builtin_types};
use crate::signature::parser::{normalize, split_unions};
use crate::signature::{Signature, parse_signature};

/// Number of leading defs the dispatcher specializes by default
pub const DEFAULT_FAST_PATH_LIMIT: usize = 6;

/// Owner of the type registry, the conversion registry, and the compiler
/// configuration
#[derive(Clone, Debug)]
pub struct Engine {
    types: TypeRegistry,
    conversions: ConversionRegistry,
    fast_path_limit: usize,
}

impl Engine {
    /// Create an engine with the built-in types and no conversions
    pub fn new() -> Self {
        let mut types = TypeRegistry::new();
        register_builtin_types(&mut types);
        Self {
            types,
            conversions: ConversionRegistry::new(),
            fast_path_limit: DEFAULT_FAST_PATH_LIMIT,
        }
    }

    /// The engine's type registry
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The engine's conversion registry
    pub fn conversions(&self) -> &ConversionRegistry {
        &self.conversions
    }

    /// Register a named type predicate
    pub fn register_type<F>(&mut self, name: impl Into<String>, test: F) -> BuildResult<()>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.types.register(name, test)
    }

    /// Register a conversion between two known type names
    pub fn register_conversion<F>(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        convert: F,
    ) -> BuildResult<()>
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        let conversion = Conversion::new(from, to, convert)?;
        self.types.find_test(conversion.from_type())?;
        self.types.find_test(conversion.to_type())?;
        self.conversions.register(conversion);
        Ok(())
    }

    /// Add a type name to the ignore set
    pub fn ignore_type(&mut self, name: impl Into<String>) {
        self.types.ignore(name);
    }

    /// How many leading defs the dispatcher specializes
    pub fn fast_path_limit(&self) -> usize {
        self.fast_path_limit
    }

    /// Tune the fast-path width; zero disables the specialized prefix
    pub fn set_fast_path_limit(&mut self, limit: usize) {
        self.fast_path_limit = limit;
    }

    /// Classify a value against this engine's type registry
    pub fn find_type(&self, value: &Value) -> DispatchResult<&str> {
        self.types.find_type(value)
    }

    /// Convert a value to the named target type
    pub fn convert(&self, value: &Value, target: &str) -> DispatchResult<Value> {
        self.conversions.convert(value, target, &self.types)
    }

    /// Compile a signatures map into a named callable
    pub fn build(
        &self,
        name: impl Into<String>,
        signatures: &Signatures,
    ) -> BuildResult<TypedFunction> {
        if signatures.is_empty() {
            return Err(BuildError::NoSignatures);
        }

        let mut entries: Vec<(Signature, NativeFn)> = Vec::new();
        let mut seen: FxHashMap<String, usize> = FxHashMap::default();
        for (text, func) in signatures {
            let parsed = parse_signature(text)?;
            let Some(normalized) = normalize(&parsed, &self.types) else {
                // Ignore-filtering emptied a param; the signature is treated
                // as if it had not been provided.
                continue;
            };
            for split in split_unions(&normalized) {
                let key = split.to_string();
                if let Some(&existing) = seen.get(&key) {
                    if Arc::ptr_eq(&entries[existing].1, func) {
                        continue;
                    }
                    return Err(BuildError::duplicate_signature(key));
                }
                seen.insert(key, entries.len());
                entries.push((split, func.clone()));
            }
        }
        if entries.is_empty() {
            return Err(BuildError::NoSignatures);
        }

        assemble(
            name.into(),
            entries,
            &self.types,
            &self.conversions,
            self.fast_path_limit,
        )
    }

    /// Compile a signatures map into an unnamed callable
    pub fn build_anonymous(&self, signatures: &Signatures) -> BuildResult<TypedFunction> {
        self.build("", signatures)
    }

    /// Merge compiled callables into one, reconciling their names
    ///
    /// All non-empty input names must agree; the merged callable carries that
    /// name, or the empty string when no input has one.
    pub fn merge(&self, functions: &[TypedFunction]) -> BuildResult<TypedFunction> {
        let mut name = String::new();
        for function in functions {
            if function.name().is_empty() {
                continue;
            }
            if name.is_empty() {
                name = function.name().to_string();
            } else if name != function.name() {
                return Err(BuildError::name_mismatch(name, function.name()));
            }
        }
        self.merge_named(name, functions)
    }

    /// Merge compiled callables under an explicit name
    ///
    /// The union of the inputs' signatures maps is recompiled against this
    /// engine. A key bound to two different implementations fails with
    /// `DuplicateSignature`; the same implementation under the same key is
    /// allowed.
    pub fn merge_named(
        &self,
        name: impl Into<String>,
        functions: &[TypedFunction],
    ) -> BuildResult<TypedFunction> {
        if functions.is_empty() {
            return Err(BuildError::NoSignatures);
        }
        let mut merged = Signatures::new();
        for function in functions {
            for (key, func) in function.signatures() {
                match merged.get(key) {
                    Some(existing) if Arc::ptr_eq(existing, func) => {}
                    Some(_) => return Err(BuildError::duplicate_signature(key.clone())),
                    None => {
                        merged.insert(key.clone(), func.clone());
                    }
                }
            }
        }
        self.build(name, &merged)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_ENGINE: Lazy<RwLock<Engine>> = Lazy::new(|| RwLock::new(Engine::new()));

/// The process-wide default engine
pub fn default_engine() -> &'static RwLock<Engine> {
    &DEFAULT_ENGINE
}

/// Compile a named callable against the default engine
pub fn build(name: impl Into<String>, signatures: &Signatures) -> BuildResult<TypedFunction> {
    DEFAULT_ENGINE.read().build(name, signatures)
}

/// Compile an unnamed callable against the default engine
pub fn build_anonymous(signatures: &Signatures) -> BuildResult<TypedFunction> {
    DEFAULT_ENGINE.read().build_anonymous(signatures)
}

/// Register a type on the default engine
pub fn register_type<F>(name: impl Into<String>, test: F) -> BuildResult<()>
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    DEFAULT_ENGINE.write().register_type(name, test)
}

/// Register a conversion on the default engine
pub fn register_conversion<F>(
    from: impl Into<String>,
    to: impl Into<String>,
    convert: F,
) -> BuildResult<()>
where
    F: Fn(&Value) -> Value + Send + Sync + 'static,
{
    DEFAULT_ENGINE.write().register_conversion(from, to, convert)
}

/// Add a type name to the default engine's ignore set
pub fn ignore_type(name: impl Into<String>) {
    DEFAULT_ENGINE.write().ignore_type(name);
}
