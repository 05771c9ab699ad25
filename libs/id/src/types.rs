//! Typed keys for counter scopes and request correlation.

use crate::define_key;

// =============================================================================
// Counter Scope
// =============================================================================

define_key!(LocationId, "location id");
define_key!(EvidenceYearId, "evidence year id");

/// Scope of one allocation counter.
///
/// Each `(location, evidence year)` pair owns an independent code sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct CounterKey {
    pub location_id: LocationId,
    pub evidence_year_id: EvidenceYearId,
}

impl CounterKey {
    /// Creates a key from raw integer ids.
    #[must_use]
    pub const fn new(location_id: i32, evidence_year_id: i32) -> Self {
        Self {
            location_id: LocationId::new(location_id),
            evidence_year_id: EvidenceYearId::new(evidence_year_id),
        }
    }
}

impl std::fmt::Display for CounterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "location={}/evidence_year={}",
            self.location_id, self.evidence_year_id
        )
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Request correlation ID in the `req_{ulid}` format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(crate::Ulid);

impl RequestId {
    /// The prefix for request IDs.
    pub const PREFIX: &'static str = "req";

    /// Creates a new ID with a fresh ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(crate::Ulid::new())
    }

    /// Parses a request ID of the form `req_{ulid}`.
    pub fn parse(s: &str) -> Result<Self, crate::IdError> {
        if s.is_empty() {
            return Err(crate::IdError::Empty);
        }

        let Some((prefix, ulid_str)) = s.split_once('_') else {
            return Err(crate::IdError::MissingSeparator);
        };

        if prefix != Self::PREFIX {
            return Err(crate::IdError::InvalidPrefix {
                expected: Self::PREFIX,
                actual: prefix.to_string(),
            });
        }

        ulid_str
            .parse::<crate::Ulid>()
            .map(Self)
            .map_err(|e| crate::IdError::InvalidUlid(e.to_string()))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = crate::IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Tests
// =============================================================================
