//! Version fingerprints derived from last-modification instants.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};

/// Any entity whose version is tracked by its last-modification instant.
///
/// The instant is owned by the persistence layer; this crate only reads it.
pub trait VersionedResource {
    /// When the resource was last modified, if ever.
    fn last_modified(&self) -> Option<DateTime<Utc>>;

    /// The fingerprint clients must echo back in `If-Match`.
    fn fingerprint(&self) -> Fingerprint {
        fingerprint_of(self.last_modified())
    }
}

impl<T: VersionedResource + ?Sized> VersionedResource for &T {
    fn last_modified(&self) -> Option<DateTime<Utc>> {
        (**self).last_modified()
    }
}

/// Opaque version token for a resource.
///
/// The empty fingerprint stands for a resource that has never been modified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The fingerprint of a resource without a modification instant.
    #[must_use]
    pub const fn empty() -> Self {
        Self(String::new())
    }

    /// Returns true for the fingerprint of a never-modified resource.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the fingerprint text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders the fingerprint as an `ETag` header value (`"<fingerprint>"`).
    #[must_use]
    pub fn etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Recovers the instant this fingerprint was computed from.
    ///
    /// Returns `None` for the empty fingerprint and for text that was not
    /// produced by [`fingerprint_of`].
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        if self.0.is_empty() {
            return None;
        }
        let bytes = STANDARD.decode(&self.0).ok()?;
        let text = String::from_utf8(bytes).ok()?;
        parse_rendered(&text)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes the fingerprint of a last-modification instant.
///
/// The instant is rendered as RFC 3339 with nanosecond precision in UTC and
/// base64 encoded, which keeps the value inside the header-safe alphabet.
/// Years outside `0000..=9999` carry an explicit sign (`+10000-01-01T...`);
/// [`Fingerprint::instant`] accepts both forms.
#[must_use]
pub fn fingerprint_of(last_modified: Option<DateTime<Utc>>) -> Fingerprint {
    match last_modified {
        None => Fingerprint::empty(),
        Some(instant) => {
            let text = instant.to_rfc3339_opts(SecondsFormat::Nanos, true);
            Fingerprint(STANDARD.encode(text.as_bytes()))
        }
    }
}

/// Parses the text rendered by [`fingerprint_of`].
fn parse_rendered(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }

    // Signed extended year, outside what RFC 3339 can express.
    let (negative, rest) = match text.as_bytes().first()? {
        b'+' => (false, &text[1..]),
        b'-' => (true, &text[1..]),
        _ => return None,
    };
    let (year, rest) = rest.split_once('-')?;
    let (month, rest) = rest.split_once('-')?;
    let (day, time) = rest.split_once('T')?;

    let year: i32 = year.parse().ok()?;
    let year = if negative { -year } else { year };
    let date = NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)?;
    let time = NaiveTime::parse_from_str(time.strip_suffix('Z')?, "%H:%M:%S%.f").ok()?;

    Some(date.and_time(time).and_utc())
}
