//! Precondition failures.

use thiserror::Error;

/// Errors returned when a conditional mutation must not proceed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    /// The request carried no `If-Match` header.
    #[error("missing precondition: the {header} header is required for this operation")]
    Missing { header: &'static str },

    /// The supplied token does not match the current fingerprint.
    #[error("precondition failed: {header} expected \"{expected}\", got {supplied}")]
    Mismatch {
        header: &'static str,
        expected: String,
        supplied: String,
    },
}

impl PreconditionError {
    /// Returns true if the client sent no token at all.
    pub fn is_missing(&self) -> bool {
        matches!(self, PreconditionError::Missing { .. })
    }

    /// Returns true if the client sent a stale or unknown token.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, PreconditionError::Mismatch { .. })
    }
}
