//! # protrack-versioning
//!
//! Optimistic concurrency for versioned resources.
//!
//! A resource's last-modification instant is projected into an opaque
//! [`Fingerprint`], exposed to clients as an `ETag`. Mutating requests must
//! echo it back in `If-Match`; [`check_precondition`] compares the supplied
//! token with a freshly computed fingerprint and rejects stale writes.
//!
//! Nothing here is persisted. Fingerprints are recomputed on every read and
//! write from the timestamp the persistence layer owns.

mod error;
mod fingerprint;
mod precondition;

pub use error::PreconditionError;
pub use fingerprint::{fingerprint_of, Fingerprint, VersionedResource};
pub use precondition::{check_precondition, PreconditionToken, WILDCARD};

/// Name of the request header carrying the precondition token.
pub const IF_MATCH_HEADER: &str = "If-Match";

/// Name of the response header carrying the fingerprint.
pub const ETAG_HEADER: &str = "ETag";
