//! # protrack-id
//!
//! Identifier types for the protrack registry.
//!
//! ## Item Codes
//!
//! Every tracked item (prototype, prototype set, prototypes package) carries a
//! 4 character base-36 code derived from a per-(location, evidence year)
//! counter:
//!
//! - `0000` is counter value 0
//! - `0001` is the first code ever allocated for a key
//! - `ZZZZ` is counter value 1,679,615, the last representable code
//!
//! Codes are short enough to be hand-written on a physical label and use only
//! `0-9A-Z`, so they survive transcription without case ambiguity.
//!
//! ## Counter Keys
//!
//! Counters are scoped by [`CounterKey`], a pair of [`LocationId`] and
//! [`EvidenceYearId`]. Both are integer keys assigned by the surrounding
//! system.
//!
//! ## Request IDs
//!
//! [`RequestId`] uses the `req_{ulid}` format for correlating logs and error
//! responses.

mod code;
mod error;
mod macros;
mod types;

pub use code::ItemCode;
pub use error::{CodeError, IdError};
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
