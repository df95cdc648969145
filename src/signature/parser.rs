//! Textual signature parsing and normalization
//!
//! Grammar:
//!
//! ```text
//! signature  := ""  |  param ("," param)*
//! param      := ws? "..."? type_union ws?
//! type_union := type_name ("|" type_name)*
//! ```
//!
//! Whitespace around commas and pipes is insignificant. `...` may prefix only
//! the last param; a bare `...` defaults its union to `any`. Type names are
//! not resolved here; unknown names surface from the test compiler when the
//! signature set is built.

use crate::error::{BuildError, BuildResult};
use crate::registry::ANY_TYPE;
use crate::registry::types::TypeRegistry;
use crate::signature::{Param, Signature};

/// Parse a textual signature like `"string, number|boolean, ...any"`
pub fn parse_signature(input: &str) -> BuildResult<Signature> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(Signature::new(Vec::new(), false));
    }

    let tokens: Vec<&str> = trimmed.split(',').collect();
    let last = tokens.len() - 1;
    let mut params = Vec::with_capacity(tokens.len());
    let mut rest_param = false;

    for (position, raw) in tokens.iter().enumerate() {
        let token = raw.trim();
        let body = match token.strip_prefix("...") {
            Some(stripped) => {
                if position != last {
                    return Err(BuildError::syntax(
                        input,
                        "rest parameter must be the last parameter",
                    ));
                }
                rest_param = true;
                stripped.trim()
            }
            None => token,
        };

        if body.is_empty() {
            if rest_param && position == last {
                // A bare `...` gathers anything.
                params.push(Param::new(vec![ANY_TYPE.to_string()]));
                continue;
            }
            return Err(BuildError::syntax(input, "empty parameter"));
        }

        let types: Vec<String> = body
            .split('|')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();
        if types.is_empty() {
            return Err(BuildError::syntax(input, "empty parameter"));
        }
        params.push(Param::new(types));
    }

    Ok(Signature::new(params, rest_param))
}

/// Strip ignored type names from every param
///
/// Returns `None` when a param is left empty, which silently invalidates the
/// whole signature: it is treated as if it had not been provided.
pub fn normalize(signature: &Signature, registry: &TypeRegistry) -> Option<Signature> {
    let mut params = Vec::with_capacity(signature.params().len());
    for param in signature.params() {
        let kept: Vec<String> = param
            .types()
            .iter()
            .filter(|name| !registry.is_ignored(name))
            .cloned()
            .collect();
        if kept.is_empty() {
            return None;
        }
        params.push(Param::new(kept));
    }
    Some(Signature::new(params, signature.rest_param()))
}

/// Split union params into the cartesian product of single-type signatures
///
/// `"number|string, boolean"` becomes `"number,boolean"` and
/// `"string,boolean"`. The public signatures map of a compiled callable is
/// keyed by these split forms.
pub fn split_unions(signature: &Signature) -> Vec<Signature> {
    let mut splits: Vec<Vec<Param>> = vec![Vec::new()];
    for param in signature.params() {
        let mut next = Vec::with_capacity(splits.len() * param.types().len());
        for prefix in &splits {
            for name in param.types() {
                let mut params = prefix.clone();
                params.push(Param::new(vec![name.clone()]));
                next.push(params);
            }
        }
        splits = next;
    }
    splits
        .into_iter()
        .map(|params| Signature::new(params, signature.rest_param()))
        .collect()
}
