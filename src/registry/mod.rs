//! Type and conversion registries
//!
//! Both registries are ordered and append-only. Compiled typed functions
//! close over registry state at build time, so later registrations never
//! affect existing callables.

pub mod conversions;
pub mod types;

pub use conversions::{Conversion, ConversionRegistry, ConvertFn};
pub use types::{ANY_TYPE, OBJECT_TYPE, TypeRegistry, TypeTest, register_builtin_types};
