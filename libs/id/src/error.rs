//! Error types for ID and identifier value parsing.

use thiserror::Error;

/// Errors that can occur when parsing or validating IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty.
    #[error("ID cannot be empty")]
    Empty,

    /// The ID has an invalid prefix.
    #[error("invalid ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    /// The ID is missing the underscore separator.
    #[error("ID missing underscore separator")]
    MissingSeparator,

    /// The ULID portion of the ID is invalid.
    #[error("invalid ULID: {0}")]
    InvalidUlid(String),

    /// The UUID of a resource reference is invalid.
    #[error("invalid resource UUID: {0}")]
    InvalidUuid(String),

    /// The identifier value does not start with a known scheme.
    #[error("unknown identifier scheme in '{0}'")]
    UnknownScheme(String),

    /// The identifier value does not match its scheme's pattern.
    #[error("malformed {scheme} identifier '{value}'")]
    Malformed { scheme: &'static str, value: String },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }

    /// Returns true if the input was an identifier value of the wrong shape.
    pub fn is_malformed_value(&self) -> bool {
        matches!(self, IdError::Malformed { .. } | IdError::UnknownScheme(_))
    }
}
