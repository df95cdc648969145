//! Conversion expansion and argument mapping
//!
//! For every compiled signature the expander derives at most one widened
//! twin covering the source types of applicable conversions. The twin's
//! params append the selected `from` names, its predicate is recompiled
//! against the widened shape, and its implementation sees arguments that
//! have already been mapped through the matching conversions.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::BuildResult;
use crate::model::Value;
use crate::registry::conversions::{ConversionRegistry, ConvertFn};
use crate::registry::types::{TypeRegistry, TypeTest};
use crate::signature::{Param, Signature};

/// Small inline buffer for mapped or gathered argument lists
pub(crate) type ArgBuf = SmallVec<[Value; 4]>;

/// Maps a raw argument list into its converted form
pub(crate) type ArgMapper = Arc<dyn Fn(&[Value]) -> ArgBuf + Send + Sync>;

/// One applicable conversion for one param position
pub(crate) struct Candidate {
    from: String,
    test: TypeTest,
    convert: ConvertFn,
}

/// Select the conversion candidates for every param of a signature
///
/// A conversion qualifies for param `i` when its target is in the param, its
/// source is not, and no earlier conversion already claimed that source for
/// the param (first-win per source). Returns `None` when no param has any
/// candidate, i.e. no widened twin is needed.
pub(crate) fn conversion_candidates(
    signature: &Signature,
    conversions: &ConversionRegistry,
    types: &TypeRegistry,
) -> BuildResult<Option<(Signature, Vec<Vec<Candidate>>)>> {
    let mut widened = Vec::with_capacity(signature.params().len());
    let mut per_param = Vec::with_capacity(signature.params().len());
    let mut any_candidates = false;

    for param in signature.params() {
        let mut candidates: Vec<Candidate> = Vec::new();
        for conversion in conversions.iter() {
            if !param.contains(conversion.to_type()) || param.contains(conversion.from_type()) {
                continue;
            }
            if candidates
                .iter()
                .any(|candidate| candidate.from == conversion.from_type())
            {
                continue;
            }
            candidates.push(Candidate {
                from: conversion.from_type().to_string(),
                test: types.find_test(conversion.from_type())?,
                convert: conversion.convert_fn().clone(),
            });
        }

        let mut names = param.types().to_vec();
        names.extend(candidates.iter().map(|candidate| candidate.from.clone()));
        widened.push(Param::new(names));
        any_candidates |= !candidates.is_empty();
        per_param.push(candidates);
    }

    if !any_candidates {
        return Ok(None);
    }
    Ok(Some((
        Signature::new(widened, signature.rest_param()),
        per_param,
    )))
}

/// Compile the per-param candidate lists into an argument mapper
///
/// Each argument position tries its candidates in declared order; the first
/// whose source test matches substitutes the converted value, otherwise the
/// argument passes through unchanged (it already matched the original
/// param). Trailing arguments of a rest signature all map through the last
/// param's candidates.
pub(crate) fn compile_arg_mapper(per_param: Vec<Vec<Candidate>>, rest_param: bool) -> ArgMapper {
    Arc::new(move |args: &[Value]| {
        let mut mapped = ArgBuf::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let slot = if index < per_param.len() {
                index
            } else if rest_param && !per_param.is_empty() {
                per_param.len() - 1
            } else {
                mapped.push(arg.clone());
                continue;
            };
            let converted = per_param[slot]
                .iter()
                .find(|candidate| (candidate.test)(arg))
                .map(|candidate| (candidate.convert)(arg));
            mapped.push(converted.unwrap_or_else(|| arg.clone()));
        }
        mapped
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::conversions::Conversion;
    use crate::registry::types::register_builtin_types;
    use crate::signature::parse_signature;

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        register_builtin_types(&mut registry);
        registry
    }

    fn boolean_to_number() -> Conversion {
        Conversion::new("boolean", "number", |value| {
            Value::Number(if value.as_bool() == Some(true) { 1.0 } else { 0.0 })
        })
        .expect("valid conversion")
    }

    #[test]
    fn widens_params_with_conversion_sources() {
        let types = registry();
        let mut conversions = ConversionRegistry::new();
        conversions.register(boolean_to_number());
        conversions.register(
            Conversion::new("string", "number", |value| {
                Value::Number(
                    value
                        .as_str()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(f64::NAN),
                )
            })
            .expect("valid conversion"),
        );

        let signature = parse_signature("number, array").unwrap();
        let (widened, per_param) = conversion_candidates(&signature, &conversions, &types)
            .unwrap()
            .expect("candidates exist");
        assert_eq!(widened.to_string(), "number|boolean|string,array");
        assert_eq!(per_param[0].len(), 2);
        assert!(per_param[1].is_empty());
    }

    #[test]
    fn first_win_per_source_type() {
        let types = registry();
        let mut conversions = ConversionRegistry::new();
        conversions.register(boolean_to_number());
        conversions
            .register(Conversion::new("boolean", "number", |_| Value::Number(99.0)).unwrap());

        let signature = parse_signature("number").unwrap();
        let (_, per_param) = conversion_candidates(&signature, &conversions, &types)
            .unwrap()
            .expect("candidates exist");
        assert_eq!(per_param[0].len(), 1);

        let mapper = compile_arg_mapper(per_param, false);
        assert_eq!(mapper(&[Value::Bool(true)])[0], Value::Number(1.0));
    }

    #[test]
    fn no_candidates_when_source_already_accepted() {
        let types = registry();
        let mut conversions = ConversionRegistry::new();
        conversions.register(boolean_to_number());

        let signature = parse_signature("number|boolean").unwrap();
        assert!(
            conversion_candidates(&signature, &conversions, &types)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn mapper_passes_matching_arguments_through() {
        let types = registry();
        let mut conversions = ConversionRegistry::new();
        conversions.register(boolean_to_number());

        let signature = parse_signature("number, number").unwrap();
        let (_, per_param) = conversion_candidates(&signature, &conversions, &types)
            .unwrap()
            .expect("candidates exist");
        let mapper = compile_arg_mapper(per_param, false);

        let mapped = mapper(&[Value::Bool(true), Value::Int(2)]);
        assert_eq!(mapped.as_slice(), [Value::Number(1.0), Value::Int(2)]);
    }

    #[test]
    fn rest_position_maps_every_trailing_argument() {
        let types = registry();
        let mut conversions = ConversionRegistry::new();
        conversions.register(boolean_to_number());

        let signature = parse_signature("string, ...number").unwrap();
        let (widened, per_param) = conversion_candidates(&signature, &conversions, &types)
            .unwrap()
            .expect("candidates exist");
        assert_eq!(widened.to_string(), "string,...number|boolean");

        let mapper = compile_arg_mapper(per_param, true);
        let mapped = mapper(&[
            Value::from("x"),
            Value::Bool(true),
            Value::Int(2),
            Value::Bool(false),
        ]);
        assert_eq!(
            mapped.as_slice(),
            [
                Value::from("x"),
                Value::Number(1.0),
                Value::Int(2),
                Value::Number(0.0),
            ]
        );
    }
}
