//! Error types for code encoding and ID parsing.

use thiserror::Error;

/// Errors that can occur when encoding or decoding an item code.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// The counter value cannot be represented with 4 base-36 digits.
    #[error("counter value {value} is out of range: expected {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    /// The code string is empty.
    #[error("item code cannot be empty")]
    Empty,

    /// The code string does not have exactly 4 characters.
    #[error("item code must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The code contains a character outside `0-9A-Z`.
    #[error("invalid item code symbol '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },
}

impl CodeError {
    /// Returns true if this error indicates counter exhaustion.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, CodeError::OutOfRange { .. })
    }
}

/// Errors that can occur when parsing prefixed or integer IDs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The ID string is empty.
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

    /// The integer key is not a valid number.
    #[error("invalid {kind}: {message}")]
    InvalidKey { kind: &'static str, message: String },
}

impl IdError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, IdError::Empty)
    }
}
