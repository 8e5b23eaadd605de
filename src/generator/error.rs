//! Typed failures raised while generating shader source.
//!
//! Every error aborts the whole generation call; no partial stage text is
//! returned to the caller.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    /// A type reachable from the graph has no syntax entry for HLSL.
    #[error("unsupported type '{type_name}' for target genhlsl")]
    UnsupportedType { type_name: String },

    /// An array port must be rendered but has no value to take its length from.
    #[error("array variable '{variable}' has no value to derive its length from")]
    MissingArrayLength { variable: String },

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("given value '{value}' is not a valid enum value for input '{input}' (expected one of: {enumeration})")]
    InvalidEnumValue {
        input: String,
        value: String,
        enumeration: String,
    },

    #[error("library fragment not found: {path}")]
    MissingLibraryFragment { path: String },

    /// The fragment exists on disk but could not be read as text.
    #[error("failed to read library fragment {path}: {reason}")]
    LibraryRead { path: String, reason: String },

    #[error("malformed graph: {0}")]
    MalformedGraph(String),
}

impl GenError {
    pub(crate) fn unsupported(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedGraph(msg.into())
    }
}

pub type GenResult<T> = Result<T, GenError>;
