//! Structured signature model and specificity ordering
//!
//! A [`Signature`] is an ordered list of [`Param`]s plus a rest flag. Its
//! `Display` implementation renders the canonical string form used as the
//! key of a typed function's public signatures map: types joined by `|`,
//! params joined by `,`, a leading `...` on a rest param, no whitespace.

pub mod parser;

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::registry::types::TypeRegistry;
pub use parser::parse_signature;

/// One position of a signature: the set of type names it accepts
///
/// Invariant: non-empty. Type order is preserved as written (and, for
/// conversion-widened params, as selected), because it is part of the
/// canonical string form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    types: Vec<String>,
}

impl Param {
    /// Create a param from a list of type names, dropping duplicates while
    /// preserving first-occurrence order
    pub fn new(types: Vec<String>) -> Self {
        let mut unique = Vec::with_capacity(types.len());
        for name in types {
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { types: unique }
    }

    /// The accepted type names, in canonical order
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Whether this param accepts the named type
    pub fn contains(&self, name: &str) -> bool {
        self.types.iter().any(|t| t == name)
    }

    /// Whether this param contains the `any` catch-all
    pub fn has_any(&self) -> bool {
        self.contains(crate::registry::ANY_TYPE)
    }
}

impl std::fmt::Display for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.types.join("|"))
    }
}

/// The declared input shape of one overload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    params: Vec<Param>,
    rest_param: bool,
}

impl Signature {
    /// Create a signature from params and a rest flag
    pub fn new(params: Vec<Param>, rest_param: bool) -> Self {
        Self { params, rest_param }
    }

    /// The params, in declaration order
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Whether the last param gathers all trailing arguments
    pub fn rest_param(&self) -> bool {
        self.rest_param
    }

    /// The smallest argument count this signature accepts
    ///
    /// A rest param matches at least one trailing argument, so the minimum
    /// arity equals the param count either way.
    pub fn min_arity(&self) -> usize {
        self.params.len()
    }

    /// The largest argument count this signature accepts, `None` if unbounded
    pub fn max_arity(&self) -> Option<usize> {
        if self.rest_param {
            None
        } else {
            Some(self.params.len())
        }
    }

    /// The param governing argument position `index`
    ///
    /// Positions beyond the declared params map onto the rest param when
    /// present, and onto nothing otherwise.
    pub fn param_at(&self, index: usize) -> Option<&Param> {
        if index < self.params.len() {
            self.params.get(index)
        } else if self.rest_param {
            self.params.last()
        } else {
            None
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last = self.params.len().saturating_sub(1);
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            if self.rest_param && index == last {
                write!(f, "...")?;
            }
            write!(f, "{param}")?;
        }
        Ok(())
    }
}

/// Build the `name -> index` map used by the specificity comparator
///
/// Indices follow registry order, so the `object` and `any` sentinels always
/// take the two largest values. Duplicate names keep their first index.
pub fn type_index_map(registry: &TypeRegistry) -> FxHashMap<String, usize> {
    let mut index = FxHashMap::default();
    for (position, name) in registry.names().enumerate() {
        index.entry(name.to_string()).or_insert(position);
    }
    index
}

/// Compare two signatures by type specificity
///
/// Non-rest signatures sort before rest signatures; then params are compared
/// element-wise over the common prefix by the lowest type index each accepts;
/// a full prefix tie is broken by param count, fewer first. Sorting with this
/// comparator is stable, so complete ties keep their insertion order and the
/// total order is deterministic.
pub fn compare_specificity(
    a: &Signature,
    b: &Signature,
    index: &FxHashMap<String, usize>,
) -> Ordering {
    match a.rest_param().cmp(&b.rest_param()) {
        Ordering::Equal => {}
        other => return other,
    }
    for (pa, pb) in a.params().iter().zip(b.params()) {
        match min_index(pa, index).cmp(&min_index(pb, index)) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    a.params().len().cmp(&b.params().len())
}

fn min_index(param: &Param, index: &FxHashMap<String, usize>) -> usize {
    param
        .types()
        .iter()
        .map(|name| index.get(name).copied().unwrap_or(usize::MAX))
        .min()
        .unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::types::register_builtin_types;
    use rstest::rstest;

    fn sig(input: &str) -> Signature {
        parse_signature(input).expect("valid signature")
    }

    fn index() -> FxHashMap<String, usize> {
        let mut registry = TypeRegistry::new();
        register_builtin_types(&mut registry);
        type_index_map(&registry)
    }

    #[rstest]
    #[case("", "")]
    #[case("number", "number")]
    #[case(" number , string ", "number,string")]
    #[case("number| string", "number|string")]
    #[case("string, ...number", "string,...number")]
    #[case("...", "...any")]
    fn canonical_form(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sig(input).to_string(), expected);
    }

    #[test]
    fn param_dedups_preserving_order() {
        let param = Param::new(vec![
            "number".to_string(),
            "string".to_string(),
            "number".to_string(),
        ]);
        assert_eq!(param.types(), ["number", "string"]);
    }

    #[test]
    fn rest_sorts_after_non_rest() {
        let index = index();
        assert_eq!(
            compare_specificity(&sig("any, any"), &sig("...number"), &index),
            Ordering::Less
        );
    }

    #[test]
    fn lower_type_index_sorts_first() {
        let index = index();
        assert_eq!(
            compare_specificity(&sig("number"), &sig("any"), &index),
            Ordering::Less
        );
        assert_eq!(
            compare_specificity(&sig("string"), &sig("integer"), &index),
            Ordering::Greater
        );
        // A union sorts by its most specific member.
        assert_eq!(
            compare_specificity(&sig("string|integer"), &sig("number"), &index),
            Ordering::Less
        );
    }

    #[test]
    fn shorter_signature_wins_prefix_ties() {
        let index = index();
        assert_eq!(
            compare_specificity(&sig("number"), &sig("number, number"), &index),
            Ordering::Less
        );
    }

    #[test]
    fn param_at_extends_rest() {
        let signature = sig("string, ...number");
        assert_eq!(signature.param_at(0).unwrap().types(), ["string"]);
        assert_eq!(signature.param_at(1).unwrap().types(), ["number"]);
        assert_eq!(signature.param_at(5).unwrap().types(), ["number"]);
        assert_eq!(sig("string").param_at(1), None);
    }

    #[test]
    fn arity_bounds() {
        assert_eq!(sig("").min_arity(), 0);
        assert_eq!(sig("").max_arity(), Some(0));
        assert_eq!(sig("...number").min_arity(), 1);
        assert_eq!(sig("...number").max_arity(), None);
        assert_eq!(sig("string, ...number").min_arity(), 2);
    }
}
