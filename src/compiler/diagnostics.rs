//! Structured diagnosis of failed dispatches
//!
//! Walks the full def set (conversion-expanded defs included, so expected
//! unions reflect convertible sources) against the actual arguments and
//! classifies the failure before any user implementation runs.

use crate::compiler::dispatch::Def;
use crate::error::DispatchError;
use crate::model::Value;
use crate::registry::types::TypeRegistry;

/// Classify why no def matched the argument list
///
/// The candidate set is narrowed one argument position at a time, testing
/// each def's param predicate at that position. The first position where the
/// set empties yields `wrongType` — unless the surviving defs simply had no
/// param there, in which case the failure is an arity problem and falls
/// through to the `tooFewArgs` / `tooManyArgs` analysis (rest params count
/// as unbounded). Anything left over is an interior `mismatch`.
pub(crate) fn create_call_error(
    function: &str,
    args: &[Value],
    defs: &[Def],
    types: &TypeRegistry,
) -> DispatchError {
    let actual: Vec<String> = args
        .iter()
        .map(|arg| {
            types
                .find_type(arg)
                .map(String::from)
                .unwrap_or_else(|_| String::from("unknown"))
        })
        .collect();

    let mut candidates: Vec<&Def> = defs.iter().collect();
    for (index, arg) in args.iter().enumerate() {
        let narrowed: Vec<&Def> = candidates
            .iter()
            .copied()
            .filter(|def| def.test_at(index).is_some_and(|test| test(arg)))
            .collect();
        if narrowed.is_empty() {
            let expected = expected_at(&candidates, index);
            if !expected.is_empty() {
                return DispatchError::WrongType {
                    function: function.to_string(),
                    index,
                    actual: actual[index].clone(),
                    expected,
                };
            }
            // Every surviving def ran out of params here; this is an arity
            // problem, not a type problem.
            break;
        }
        candidates = narrowed;
    }

    let min_required = candidates
        .iter()
        .map(|def| {
            if def.signature.rest_param() {
                usize::MAX
            } else {
                def.signature.min_arity()
            }
        })
        .min()
        .unwrap_or(0);
    if args.len() < min_required {
        return DispatchError::TooFewArgs {
            function: function.to_string(),
            index: args.len(),
            expected: expected_at(&candidates, args.len()),
        };
    }

    let max_allowed = candidates
        .iter()
        .map(|def| def.signature.max_arity())
        .try_fold(0usize, |max, arity| arity.map(|n| max.max(n)));
    if let Some(max_allowed) = max_allowed {
        if args.len() > max_allowed {
            return DispatchError::TooManyArgs {
                function: function.to_string(),
                actual: args.len(),
                expected_length: max_allowed,
            };
        }
    }

    DispatchError::Mismatch {
        function: function.to_string(),
        actual,
    }
}

/// Ordered, deduplicated union of the type names the given defs expect at
/// `index`
fn expected_at(defs: &[&Def], index: usize) -> Vec<String> {
    let mut expected = Vec::new();
    for def in defs {
        let Some(param) = def.signature.param_at(index) else {
            continue;
        };
        for name in param.types() {
            if !expected.contains(name) {
                expected.push(name.clone());
            }
        }
    }
    expected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::dispatch::Def;
    use crate::error::DispatchResult;
    use crate::registry::types::register_builtin_types;
    use crate::signature::parse_signature;
    use std::sync::Arc;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        register_builtin_types(&mut registry);
        registry
    }

    fn def(signature: &str, types: &TypeRegistry) -> Def {
        Def::compile(
            parse_signature(signature).unwrap(),
            Arc::new(|_: &[Value]| -> DispatchResult<Value> { Ok(Value::Null) }),
            None,
            false,
            types,
        )
        .expect("compilable def")
    }

    #[test]
    fn wrong_type_reports_union_of_viable_params() {
        let types = registry();
        let defs = vec![def("number", &types), def("string", &types)];
        let error = create_call_error("f", &[Value::Bool(true)], &defs, &types);
        assert_eq!(
            error,
            DispatchError::WrongType {
                function: "f".to_string(),
                index: 0,
                actual: "boolean".to_string(),
                expected: vec!["number".to_string(), "string".to_string()],
            }
        );
    }

    #[test]
    fn wrong_type_narrows_before_reporting() {
        let types = registry();
        let defs = vec![def("number, number", &types), def("string, string", &types)];
        // The first argument narrows to the string def; the second argument
        // then fails against it alone.
        let error = create_call_error("f", &[Value::from("x"), Value::Bool(true)], &defs, &types);
        assert_eq!(
            error,
            DispatchError::WrongType {
                function: "f".to_string(),
                index: 1,
                actual: "boolean".to_string(),
                expected: vec!["string".to_string()],
            }
        );
    }

    #[test]
    fn narrowing_follows_predicates_not_names() {
        let types = registry();
        // An integer argument satisfies a `number` param even though its
        // classified name differs.
        let defs = vec![def("number, string", &types)];
        let error = create_call_error("f", &[Value::Int(1), Value::Int(2)], &defs, &types);
        assert_eq!(
            error,
            DispatchError::WrongType {
                function: "f".to_string(),
                index: 1,
                actual: "integer".to_string(),
                expected: vec!["string".to_string()],
            }
        );
    }

    #[test]
    fn too_few_args_reports_next_expected_position() {
        let types = registry();
        let defs = vec![def("number, number", &types)];
        let error = create_call_error("f", &[Value::Int(1)], &defs, &types);
        assert_eq!(
            error,
            DispatchError::TooFewArgs {
                function: "f".to_string(),
                index: 1,
                expected: vec!["number".to_string()],
            }
        );
    }

    #[test]
    fn rest_def_is_unbounded_below() {
        let types = registry();
        let defs = vec![def("string, ...number", &types)];
        let error = create_call_error("f", &[Value::from("x")], &defs, &types);
        assert_eq!(
            error,
            DispatchError::TooFewArgs {
                function: "f".to_string(),
                index: 1,
                expected: vec!["number".to_string()],
            }
        );
    }

    #[test]
    fn too_many_args_reports_largest_arity() {
        let types = registry();
        let defs = vec![def("number", &types), def("number, number", &types)];
        let error = create_call_error(
            "f",
            &[Value::Int(1), Value::Int(2), Value::Int(3)],
            &defs,
            &types,
        );
        assert_eq!(
            error,
            DispatchError::TooManyArgs {
                function: "f".to_string(),
                actual: 3,
                expected_length: 2,
            }
        );
    }

    #[test]
    fn empty_call_against_rest_only_defs_is_too_few() {
        let types = registry();
        let defs = vec![def("...any", &types)];
        let error = create_call_error("f", &[], &defs, &types);
        assert_eq!(
            error,
            DispatchError::TooFewArgs {
                function: "f".to_string(),
                index: 0,
                expected: vec!["any".to_string()],
            }
        );
    }
}
