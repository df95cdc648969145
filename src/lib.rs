//! Runtime multiple dispatch for dynamically typed function calls
//!
//! Given a map of textual signatures to implementations, the compiler
//! produces a single [`TypedFunction`] that selects the right implementation
//! from the runtime types of its arguments, optionally applying declared
//! conversions, and reports structured errors on mismatch.
//!
//! ```
//! use typed_dispatch::{Engine, Value, signatures};
//!
//! let engine = Engine::new();
//! let double = engine
//!     .build("double", &signatures! {
//!         "number" => |args: &[Value]| {
//!             Ok(Value::from(args[0].as_number().unwrap_or(0.0) * 2.0))
//!         },
//!         "string" => |args: &[Value]| {
//!             let s = args[0].as_str().unwrap_or_default();
//!             Ok(Value::from(format!("{s}{s}")))
//!         },
//!     })
//!     .unwrap();
//!
//! assert_eq!(double.call(&[Value::from(21.0)]).unwrap(), Value::from(42.0));
//! assert_eq!(double.call(&[Value::from("ab")]).unwrap(), Value::from("abab"));
//! assert!(double.call(&[Value::Bool(true)]).is_err());
//! ```

#![warn(missing_docs)]

pub mod compiler;
pub mod engine;
pub mod error;
pub mod model;
pub mod registry;
pub mod signature;

// Re-export main types
pub use compiler::{NativeFn, Signatures, TypedFunction};
pub use engine::{
    DEFAULT_FAST_PATH_LIMIT, Engine, build, build_anonymous, default_engine, ignore_type,
    register_conversion, register_type,
};
pub use error::{BuildError, BuildResult, DispatchError, DispatchResult};
pub use model::Value;
pub use registry::{
    ANY_TYPE, Conversion, ConversionRegistry, ConvertFn, OBJECT_TYPE, TypeRegistry, TypeTest,
};
pub use signature::{Param, Signature, parse_signature};
