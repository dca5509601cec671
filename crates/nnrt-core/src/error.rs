//! Error types for the boundary data model.

use thiserror::Error;

/// Result type for boundary model operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or reading boundary entities.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A shape exceeded the dimension limit or disagreed with its buffer.
    #[error("Invalid tensor shape for '{name}': {reason}")]
    InvalidTensorShape {
        /// Tensor name.
        name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A numeric dtype code that has no `DType` counterpart.
    #[error("Unknown dtype code: {0}")]
    UnknownDType(u32),

    /// A numeric layout code that has no `Format` counterpart.
    #[error("Unknown format code: {0}")]
    UnknownFormat(u32),

    /// An attribute record carries a tag outside the supported set.
    #[error("Unsupported attribute type code {code} on attribute '{name}'")]
    UnsupportedAttributeType {
        /// Attribute name.
        name: String,
        /// The offending tag.
        code: u32,
    },

    /// An accessor was called for a variant the attribute does not hold.
    #[error("Attribute '{name}' holds {actual}, not {expected}")]
    AttributeTypeMismatch {
        /// Attribute name.
        name: String,
        /// Requested variant.
        expected: &'static str,
        /// Variant actually held.
        actual: &'static str,
    },

    /// Generic invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl CoreError {
    /// Shorthand for an [`CoreError::InvalidTensorShape`].
    pub fn invalid_shape(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTensorShape {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
