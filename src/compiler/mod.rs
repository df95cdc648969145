//! Signature compilation pipeline
//!
//! `parse -> normalize/split -> order -> expand conversions -> compile
//! predicates -> assemble`. Everything here runs synchronously at build time;
//! the only artifact that escapes is the immutable [`TypedFunction`].

pub(crate) mod conversion;
pub(crate) mod diagnostics;
pub mod dispatch;
pub(crate) mod predicate;

pub use dispatch::{NativeFn, Signatures, TypedFunction};

/// Build a [`Signatures`](crate::Signatures) map from `"signature" => impl`
/// pairs
///
/// ```
/// use typed_dispatch::{Value, signatures};
///
/// let map = signatures! {
///     "number" => |args: &[Value]| Ok(Value::from(args[0].as_number().unwrap_or(0.0) + 1.0)),
///     "string" => |args: &[Value]| Ok(args[0].clone()),
/// };
/// assert_eq!(map.len(), 2);
/// ```
#[macro_export]
macro_rules! signatures {
    () => {
        $crate::Signatures::new()
    };
    ( $( $signature:expr => $func:expr ),+ $(,)? ) => {{
        let mut map = $crate::Signatures::new();
        $(
            map.insert(
                ::std::string::String::from($signature),
                ::std::sync::Arc::new($func) as $crate::NativeFn,
            );
        )+
        map
    }};
}
