//! Dispatcher assembly and the compiled callable
//!
//! [`TypedFunction`] is the product of the compiler: an immutable callable
//! that routes an argument list to the first matching def. Up to
//! `fast_path_limit` leading defs with arity <= 2 and no rest param are
//! specialized into a prefix of precomputed arity/predicate checks; the
//! remaining defs are scanned linearly. When nothing matches, the error
//! builder classifies the failure.

use indexmap::IndexMap;

use crate::compiler::conversion::{ArgBuf, ArgMapper, compile_arg_mapper, conversion_candidates};
use crate::compiler::diagnostics::create_call_error;
use crate::compiler::predicate::{ArgsTest, ParamTest, args_test_from, compile_param_tests};
use crate::error::{BuildError, BuildResult, DispatchResult};
use crate::model::Value;
use crate::registry::conversions::ConversionRegistry;
use crate::registry::types::TypeRegistry;
use crate::signature::Signature;

/// A user implementation bound to a signature
pub type NativeFn =
    std::sync::Arc<dyn Fn(&[Value]) -> DispatchResult<Value> + Send + Sync>;

/// Map from canonical signature strings to implementations
///
/// Insertion order is meaningful: it is the tie-breaker of the deterministic
/// def order, and the order `signatures()` metadata is reported in.
pub type Signatures = IndexMap<String, NativeFn>;

/// One compiled overload
pub(crate) struct Def {
    pub(crate) signature: Signature,
    pub(crate) test: ArgsTest,
    pub(crate) param_tests: Vec<ParamTest>,
    pub(crate) func: NativeFn,
    pub(crate) converter: Option<ArgMapper>,
    pub(crate) from_conversion: bool,
}

impl std::fmt::Debug for Def {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Def")
            .field("signature", &self.signature.to_string())
            .field("from_conversion", &self.from_conversion)
            .finish()
    }
}

impl Def {
    /// Compile a def from its signature and implementation
    pub(crate) fn compile(
        signature: Signature,
        func: NativeFn,
        converter: Option<ArgMapper>,
        from_conversion: bool,
        types: &TypeRegistry,
    ) -> BuildResult<Self> {
        let param_tests = compile_param_tests(&signature, types)?;
        let test = args_test_from(&signature, &param_tests);
        Ok(Self {
            signature,
            test,
            param_tests,
            func,
            converter,
            from_conversion,
        })
    }

    /// The predicate governing argument position `index`, extending the rest
    /// param over trailing positions
    pub(crate) fn test_at(&self, index: usize) -> Option<&ParamTest> {
        if index < self.param_tests.len() {
            self.param_tests.get(index)
        } else if self.signature.rest_param() {
            self.param_tests.last()
        } else {
            None
        }
    }
}

/// A specialized entry of the fast path: precomputed arity and predicates
struct FastDef {
    arity: usize,
    test0: Option<ParamTest>,
    test1: Option<ParamTest>,
    def_index: usize,
}

/// A compiled multiple-dispatch callable
///
/// Immutable after construction: it closed over the registry state it was
/// compiled against, so later registry mutation never changes its behavior.
#[derive(Clone)]
pub struct TypedFunction {
    name: String,
    defs: std::sync::Arc<DispatchTable>,
    signatures: Signatures,
}

struct DispatchTable {
    defs: Vec<Def>,
    fast: Vec<FastDef>,
    generic_start: usize,
    types: TypeRegistry,
}

impl std::fmt::Debug for TypedFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedFunction")
            .field("name", &self.name)
            .field("signatures", &self.signatures.keys().collect::<Vec<_>>())
            .field("defs", &self.defs.defs)
            .finish()
    }
}

impl TypedFunction {
    /// The function's name; empty when built anonymously
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The original signatures, keyed by canonical string form
    ///
    /// Conversion-expanded defs are not part of this map. Iteration order is
    /// the deterministic sorted def order.
    pub fn signatures(&self) -> &Signatures {
        &self.signatures
    }

    /// Invoke the callable with a list of dynamic arguments
    pub fn call(&self, args: &[Value]) -> DispatchResult<Value> {
        let table = self.defs.as_ref();
        for fast in &table.fast {
            if args.len() == fast.arity
                && fast.test0.as_ref().is_none_or(|test| test(&args[0]))
                && fast.test1.as_ref().is_none_or(|test| test(&args[1]))
            {
                return self.invoke(&table.defs[fast.def_index], args);
            }
        }
        for def in &table.defs[table.generic_start..] {
            if (def.test)(args) {
                return self.invoke(def, args);
            }
        }
        log::trace!(
            "dispatch failed for '{}' with {} argument(s)",
            self.name,
            args.len()
        );
        Err(create_call_error(&self.name, args, &table.defs, &table.types))
    }

    fn invoke(&self, def: &Def, args: &[Value]) -> DispatchResult<Value> {
        match &def.converter {
            Some(mapper) => {
                let mapped = mapper(args);
                self.finish(def, &mapped)
            }
            None => self.finish(def, args),
        }
    }

    fn finish(&self, def: &Def, args: &[Value]) -> DispatchResult<Value> {
        if def.signature.rest_param() {
            let gathered = gather_rest(args, def.signature.params().len());
            (def.func)(&gathered)
        } else {
            (def.func)(args)
        }
    }

    /// Exact-signature lookup by canonical (or loosely spaced) string
    ///
    /// No fuzzy or conversion-aware matching: the normalized key must be
    /// present in [`TypedFunction::signatures`].
    pub fn find(&self, signature: &str) -> BuildResult<&NativeFn> {
        let key = normalize_key(signature);
        self.signatures
            .get(&key)
            .ok_or_else(|| BuildError::not_found(key))
    }

    /// Exact-signature lookup by a sequence of type names
    pub fn find_by_types<I>(&self, names: I) -> BuildResult<&NativeFn>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let key: Vec<String> = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .collect();
        self.find(&key.join(","))
    }
}

fn normalize_key(signature: &str) -> String {
    signature
        .split(',')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(",")
}

/// Gather trailing arguments of a rest def into a single array argument
fn gather_rest(args: &[Value], param_count: usize) -> ArgBuf {
    let split = param_count.saturating_sub(1);
    let mut gathered: ArgBuf = args[..split].iter().cloned().collect();
    gathered.push(Value::Array(args[split..].to_vec()));
    gathered
}

/// Combine split, deduplicated signature entries into a callable
///
/// `entries` are the post-normalization originals in signatures-map order;
/// they are sorted by specificity here, augmented with their
/// conversion-expanded twins, and specialized into the fast path.
pub(crate) fn assemble(
    name: String,
    mut entries: Vec<(Signature, NativeFn)>,
    types: &TypeRegistry,
    conversions: &ConversionRegistry,
    fast_path_limit: usize,
) -> BuildResult<TypedFunction> {
    let index = crate::signature::type_index_map(types);
    entries.sort_by(|a, b| crate::signature::compare_specificity(&a.0, &b.0, &index));

    let mut signatures = Signatures::new();
    for (signature, func) in &entries {
        signatures.insert(signature.to_string(), func.clone());
    }

    let mut defs = Vec::with_capacity(entries.len() * 2);
    for (signature, func) in &entries {
        defs.push(Def::compile(
            signature.clone(),
            func.clone(),
            None,
            false,
            types,
        )?);
    }
    for (signature, func) in &entries {
        if let Some((widened, per_param)) = conversion_candidates(signature, conversions, types)? {
            let mapper = compile_arg_mapper(per_param, widened.rest_param());
            defs.push(Def::compile(
                widened,
                func.clone(),
                Some(mapper),
                true,
                types,
            )?);
        }
    }

    let prefix = fast_path_limit.min(defs.len());
    let mut fast = Vec::with_capacity(prefix);
    let mut all_qualify = true;
    for (def_index, def) in defs.iter().take(prefix).enumerate() {
        if def.signature.rest_param() || def.signature.params().len() > 2 {
            all_qualify = false;
            continue;
        }
        fast.push(FastDef {
            arity: def.signature.params().len(),
            test0: def.param_tests.first().cloned(),
            test1: def.param_tests.get(1).cloned(),
            def_index,
        });
    }
    let generic_start = if all_qualify { prefix } else { 0 };

    log::debug!(
        "compiled '{}': {} def(s) ({} from conversions), fast path {}, generic from {}",
        name,
        defs.len(),
        defs.iter().filter(|def| def.from_conversion).count(),
        fast.len(),
        generic_start
    );
    for def in &defs {
        log::trace!("  def {:?}", def);
    }

    Ok(TypedFunction {
        name,
        defs: std::sync::Arc::new(DispatchTable {
            defs,
            fast,
            generic_start,
            types: types.clone(),
        }),
        signatures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DispatchError;
    use crate::registry::conversions::Conversion;
    use crate::registry::types::register_builtin_types;
    use crate::signature::parse_signature;
    use std::sync::Arc;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        register_builtin_types(&mut registry);
        registry
    }

    fn tag(value: &str) -> NativeFn {
        let value = value.to_string();
        Arc::new(move |_: &[Value]| Ok(Value::String(value.clone())))
    }

    fn entries(pairs: &[(&str, NativeFn)]) -> Vec<(Signature, NativeFn)> {
        pairs
            .iter()
            .map(|(signature, func)| (parse_signature(signature).unwrap(), func.clone()))
            .collect()
    }

    #[test]
    fn defs_are_sorted_by_specificity() {
        let types = registry();
        let compiled = assemble(
            "f".to_string(),
            entries(&[
                ("any", tag("any")),
                ("...string", tag("rest")),
                ("number", tag("number")),
            ]),
            &types,
            &ConversionRegistry::new(),
            6,
        )
        .unwrap();
        let keys: Vec<&String> = compiled.signatures().keys().collect();
        assert_eq!(keys, ["number", "any", "...string"]);
    }

    #[test]
    fn signatures_metadata_excludes_conversion_defs() {
        let types = registry();
        let mut conversions = ConversionRegistry::new();
        conversions.register(
            Conversion::new("boolean", "number", |value| {
                Value::Number(if value.as_bool() == Some(true) { 1.0 } else { 0.0 })
            })
            .unwrap(),
        );
        let compiled = assemble(
            "f".to_string(),
            entries(&[("number", tag("number"))]),
            &types,
            &conversions,
            6,
        )
        .unwrap();
        assert_eq!(compiled.signatures().len(), 1);
        assert!(compiled.signatures().contains_key("number"));
        // The widened def still dispatches.
        assert_eq!(
            compiled.call(&[Value::Bool(true)]).unwrap(),
            Value::String("number".to_string())
        );
    }

    #[test]
    fn rest_defs_gather_trailing_arguments() {
        let types = registry();
        let compiled = assemble(
            "join".to_string(),
            entries(&[(
                "string, ...number",
                Arc::new(|args: &[Value]| {
                    let head = args[0].as_str().unwrap_or_default();
                    let count = args[1].as_array().map_or(0, <[Value]>::len);
                    Ok(Value::String(format!("{head}{count}")))
                }),
            )]),
            &types,
            &ConversionRegistry::new(),
            6,
        )
        .unwrap();
        assert_eq!(
            compiled
                .call(&[Value::from("x"), Value::Int(1), Value::Int(2)])
                .unwrap(),
            Value::String("x2".to_string())
        );
    }

    #[test]
    fn generic_scan_starts_at_zero_when_prefix_disqualifies() {
        let types = registry();
        // An arity-3 def sorts first (null has the lowest index), so the
        // fast-path prefix is not fully specializable.
        let compiled = assemble(
            "f".to_string(),
            entries(&[
                ("null, null, null", tag("wide")),
                ("number", tag("number")),
            ]),
            &types,
            &ConversionRegistry::new(),
            6,
        )
        .unwrap();
        assert_eq!(
            compiled
                .call(&[Value::Null, Value::Null, Value::Null])
                .unwrap(),
            Value::String("wide".to_string())
        );
        assert_eq!(
            compiled.call(&[Value::Int(1)]).unwrap(),
            Value::String("number".to_string())
        );
    }

    #[test]
    fn fast_path_limit_zero_still_dispatches() {
        let types = registry();
        let compiled = assemble(
            "f".to_string(),
            entries(&[("number", tag("number"))]),
            &types,
            &ConversionRegistry::new(),
            0,
        )
        .unwrap();
        assert_eq!(
            compiled.call(&[Value::Int(1)]).unwrap(),
            Value::String("number".to_string())
        );
    }

    #[test]
    fn find_normalizes_whitespace() {
        let types = registry();
        let compiled = assemble(
            "f".to_string(),
            entries(&[("number, string", tag("pair"))]),
            &types,
            &ConversionRegistry::new(),
            6,
        )
        .unwrap();
        assert!(compiled.find("number , string").is_ok());
        assert!(compiled.find_by_types(["number", "string"]).is_ok());
        assert!(matches!(
            compiled.find("string, number"),
            Err(BuildError::NotFound { .. })
        ));
    }

    #[test]
    fn user_errors_propagate() {
        let types = registry();
        let compiled = assemble(
            "f".to_string(),
            entries(&[(
                "number",
                Arc::new(|_: &[Value]| {
                    Err(DispatchError::evaluation("f", "division by zero"))
                }),
            )]),
            &types,
            &ConversionRegistry::new(),
            6,
        )
        .unwrap();
        assert!(matches!(
            compiled.call(&[Value::Int(1)]),
            Err(DispatchError::Evaluation { .. })
        ));
    }
}
