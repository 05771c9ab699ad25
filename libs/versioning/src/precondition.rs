//! `If-Match` token parsing and the precondition decision.

use crate::{Fingerprint, PreconditionError, IF_MATCH_HEADER};

/// The `If-Match` value that matches any current version.
pub const WILDCARD: &str = "*";

/// The precondition a client attached to a mutating request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionToken {
    /// No `If-Match` header was sent.
    Absent,
    /// `If-Match: *`.
    Wildcard,
    /// One or more entity tags with quoting removed.
    Tags(Vec<String>),
}

impl PreconditionToken {
    /// Parses a raw `If-Match` header value.
    ///
    /// Accepts a single tag or a comma separated list. Each tag may be quoted.
    /// Weak tags (`W/"..."`) are kept verbatim so they never compare equal to a
    /// fingerprint. A blank header counts as absent.
    #[must_use]
    pub fn parse(header: Option<&str>) -> Self {
        let Some(raw) = header.map(str::trim) else {
            return Self::Absent;
        };

        if raw.is_empty() {
            return Self::Absent;
        }

        if raw == WILDCARD {
            return Self::Wildcard;
        }

        let tags: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(|tag| unquote(tag).to_string())
            .collect();

        if tags.is_empty() {
            Self::Absent
        } else {
            Self::Tags(tags)
        }
    }

    /// Builds a token from a single fingerprint, as a well-behaved client would.
    #[must_use]
    pub fn from_fingerprint(fingerprint: &Fingerprint) -> Self {
        Self::Tags(vec![fingerprint.as_str().to_string()])
    }
}

impl std::fmt::Display for PreconditionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => f.write_str("<absent>"),
            Self::Wildcard => f.write_str(WILDCARD),
            Self::Tags(tags) => {
                let rendered: Vec<String> = tags
                    .iter()
                    .map(|t| {
                        if t.starts_with("W/") {
                            t.clone()
                        } else {
                            format!("\"{t}\"")
                        }
                    })
                    .collect();
                f.write_str(&rendered.join(", "))
            }
        }
    }
}

fn unquote(tag: &str) -> &str {
    if tag.starts_with("W/") {
        return tag;
    }
    tag.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(tag)
}

/// Decides whether a conditional mutation may proceed.
///
/// `current` must be computed from freshly loaded state on every request.
///
/// # Errors
///
/// - [`PreconditionError::Missing`] if no token was supplied.
/// - [`PreconditionError::Mismatch`] if no supplied tag equals `current`, or
///   if `*` was sent to an operation that does not allow it.
pub fn check_precondition(
    current: &Fingerprint,
    supplied: &PreconditionToken,
    allow_wildcard: bool,
) -> Result<(), PreconditionError> {
    match supplied {
        PreconditionToken::Absent => Err(PreconditionError::Missing {
            header: IF_MATCH_HEADER,
        }),
        PreconditionToken::Wildcard if allow_wildcard => Ok(()),
        PreconditionToken::Tags(tags) if tags.iter().any(|t| t == current.as_str()) => Ok(()),
        other => Err(PreconditionError::Mismatch {
            header: IF_MATCH_HEADER,
            expected: current.as_str().to_string(),
            supplied: other.to_string(),
        }),
    }
}
