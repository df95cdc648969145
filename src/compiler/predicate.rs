//! Compilation of signatures into argument predicates

use std::sync::Arc;

use crate::error::BuildResult;
use crate::model::Value;
use crate::registry::types::{TypeRegistry, TypeTest};
use crate::signature::{Param, Signature};

/// A compiled predicate over a single argument
pub(crate) type ParamTest = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A compiled predicate over a full argument list
pub(crate) type ArgsTest = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Compile one param into a predicate: the disjunction of its type tests
///
/// A param containing `any` short-circuits to an unconditional accept without
/// touching the registry.
pub(crate) fn compile_param_test(param: &Param, types: &TypeRegistry) -> BuildResult<ParamTest> {
    if param.has_any() {
        return Ok(Arc::new(|_| true));
    }
    let tests: Vec<TypeTest> = param
        .types()
        .iter()
        .map(|name| types.find_test(name))
        .collect::<BuildResult<_>>()?;
    if tests.len() == 1 {
        let test = tests
            .into_iter()
            .next()
            .unwrap_or_else(|| Arc::new(|_| false));
        return Ok(test);
    }
    Ok(Arc::new(move |value| tests.iter().any(|test| test(value))))
}

/// Compile every param of a signature
pub(crate) fn compile_param_tests(
    signature: &Signature,
    types: &TypeRegistry,
) -> BuildResult<Vec<ParamTest>> {
    signature
        .params()
        .iter()
        .map(|param| compile_param_test(param, types))
        .collect()
}

/// Combine precompiled param tests into a predicate over the whole argument
/// list
pub(crate) fn args_test_from(signature: &Signature, param_tests: &[ParamTest]) -> ArgsTest {
    if param_tests.is_empty() {
        return Arc::new(|args: &[Value]| args.is_empty());
    }

    let arity = param_tests.len();
    if signature.rest_param() {
        let leading: Vec<ParamTest> = param_tests[..arity - 1].to_vec();
        let trailing = param_tests[arity - 1].clone();
        return Arc::new(move |args: &[Value]| {
            args.len() >= arity
                && leading.iter().zip(args).all(|(test, arg)| test(arg))
                && args[arity - 1..].iter().all(|arg| trailing(arg))
        });
    }

    let tests: Vec<ParamTest> = param_tests.to_vec();
    Arc::new(move |args: &[Value]| {
        args.len() == arity && tests.iter().zip(args).all(|(test, arg)| test(arg))
    })
}
