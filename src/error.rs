//! Error types for signature compilation and dispatch
//!
//! Errors come in two phases with distinct taxonomies: [`BuildError`] is
//! raised while a typed function is being compiled, [`DispatchError`] is
//! raised when an assembled typed function is invoked.

use thiserror::Error;

/// Result type alias for construction-time operations
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Result type alias for call-time operations
pub type DispatchResult<T> = std::result::Result<T, DispatchError>;

/// Errors raised while compiling a set of signatures into a typed function
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    /// The signatures map was empty, or every signature was dropped by
    /// ignore-filtering
    #[error("No signatures provided")]
    NoSignatures,

    /// Malformed signature string
    #[error("Invalid signature '{signature}': {message}")]
    Syntax {
        /// The offending signature string, as written
        signature: String,
        /// What was wrong with it
        message: String,
    },

    /// A signature referenced a type name not present in the registry
    #[error("Unknown type '{name}'{}", hint.as_ref().map(|h| format!(" (did you mean '{h}'?)")).unwrap_or_default())]
    UnknownType {
        /// The unresolved type name
        name: String,
        /// A case-insensitive match among registered names, if any
        hint: Option<String>,
    },

    /// The same canonical signature was bound to two different implementations
    #[error("Conflicting signatures: '{signature}' is bound to more than one implementation")]
    DuplicateSignature {
        /// The canonical signature key
        signature: String,
    },

    /// Two merged typed functions carry different non-empty names
    #[error("Function names do not match: '{left}' != '{right}'")]
    NameMismatch {
        /// Name carried by the earlier input
        left: String,
        /// Name carried by the later input
        right: String,
    },

    /// Malformed type or conversion registration
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was malformed
        message: String,
    },

    /// Exact-signature lookup failed
    #[error("Signature '{signature}' not found")]
    NotFound {
        /// The normalized lookup key
        signature: String,
    },
}

impl BuildError {
    /// Create a syntax error for a malformed signature string
    pub fn syntax(signature: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Syntax {
            signature: signature.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-type error with an optional did-you-mean hint
    pub fn unknown_type(name: impl Into<String>, hint: Option<String>) -> Self {
        Self::UnknownType {
            name: name.into(),
            hint,
        }
    }

    /// Create a duplicate-signature error
    pub fn duplicate_signature(signature: impl Into<String>) -> Self {
        Self::DuplicateSignature {
            signature: signature.into(),
        }
    }

    /// Create a name-mismatch error
    pub fn name_mismatch(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::NameMismatch {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a not-found error for an exact-signature lookup
    pub fn not_found(signature: impl Into<String>) -> Self {
        Self::NotFound {
            signature: signature.into(),
        }
    }
}

/// Errors raised when an assembled typed function is invoked
///
/// The first four variants are the mismatch categories produced by the error
/// builder; [`DispatchError::category`] exposes the category as a slug so
/// callers can branch on it without destructuring.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// An argument had a type no viable signature accepts at its position
    #[error("Unexpected type of argument in function '{function}' (expected: {}, actual: {actual}, index: {index})", expected.join(" or "))]
    WrongType {
        /// Name of the typed function
        function: String,
        /// Position of the offending argument
        index: usize,
        /// Observed type of the argument
        actual: String,
        /// Union of types the still-viable signatures expected there
        expected: Vec<String>,
    },

    /// Fewer arguments than any viable signature accepts
    #[error("Too few arguments in function '{function}' (expected: {}, index: {index})", expected.join(" or "))]
    TooFewArgs {
        /// Name of the typed function
        function: String,
        /// Position of the first missing argument
        index: usize,
        /// Union of types expected at that position
        expected: Vec<String>,
    },

    /// More arguments than any viable signature accepts
    #[error("Too many arguments in function '{function}' (expected: {expected_length}, actual: {actual})")]
    TooManyArgs {
        /// Name of the typed function
        function: String,
        /// Number of arguments provided
        actual: usize,
        /// Largest arity among the viable signatures
        expected_length: usize,
    },

    /// Narrowing succeeded but no full signature predicate matched
    #[error("Arguments of type ({}) do not match any signature of function '{function}'", actual.join(", "))]
    Mismatch {
        /// Name of the typed function
        function: String,
        /// Observed types of all arguments
        actual: Vec<String>,
    },

    /// No registered conversion covers the requested pair
    #[error("Cannot convert from '{from}' to '{to}'")]
    NoConversion {
        /// Observed type of the value
        from: String,
        /// Requested target type
        to: String,
    },

    /// No registered predicate matched the value (the `any` sentinel makes
    /// this unreachable in practice)
    #[error("Value has an unknown type")]
    UnknownValueType,

    /// A user implementation failed after dispatch succeeded
    #[error("Function '{function}' evaluation error: {message}")]
    Evaluation {
        /// Name of the typed function
        function: String,
        /// Error message from the implementation
        message: String,
    },
}

impl DispatchError {
    /// Create an evaluation error for a failing user implementation
    pub fn evaluation(function: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Evaluation {
            function: function.into(),
            message: message.into(),
        }
    }

    /// The category slug of this error, for programmatic handling
    pub fn category(&self) -> &'static str {
        match self {
            Self::WrongType { .. } => "wrongType",
            Self::TooFewArgs { .. } => "tooFewArgs",
            Self::TooManyArgs { .. } => "tooManyArgs",
            Self::Mismatch { .. } => "mismatch",
            Self::NoConversion { .. } => "noConversion",
            Self::UnknownValueType => "unknownValueType",
            Self::Evaluation { .. } => "evaluation",
        }
    }
}
