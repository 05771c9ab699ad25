//! HTTP binding for optimistic concurrency.
//!
//! Handlers that expose a versioned resource attach [`etag_header`] to their
//! responses. Handlers that mutate one extract [`IfMatch`] and call
//! [`check_if_match`] against the freshly loaded resource before writing,
//! inside the same transaction as the write.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{ETAG, IF_MATCH};
use axum::http::request::Parts;
use axum::http::{HeaderName, HeaderValue};
use protrack_versioning::{
    check_precondition, PreconditionError, PreconditionToken, VersionedResource,
};

use crate::api::error::{ApiError, FieldError};

/// The `If-Match` precondition of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfMatch(pub PreconditionToken);

impl IfMatch {
    /// Parses a raw header value; `None` means the header was absent.
    pub fn from_header(value: Option<&str>) -> Self {
        Self(PreconditionToken::parse(value))
    }
}

impl<S> FromRequestParts<S> for IfMatch
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IF_MATCH)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        Ok(Self::from_header(raw.as_deref()))
    }
}

/// Rejects the mutation unless `if_match` names the resource's current version.
///
/// `allow_wildcard` lets `If-Match: *` through regardless of version.
pub fn check_if_match<R>(
    resource: &R,
    if_match: &IfMatch,
    allow_wildcard: bool,
    request_id: &str,
) -> Result<(), ApiError>
where
    R: VersionedResource + ?Sized,
{
    let current = resource.fingerprint();
    check_precondition(&current, &if_match.0, allow_wildcard).map_err(|e| {
        tracing::info!(request_id = %request_id, error = %e, "Precondition failed");
        precondition_error(e).with_request_id(request_id)
    })
}

/// The `ETag` header for a resource.
pub fn etag_header<R>(resource: &R) -> Result<[(HeaderName, HeaderValue); 1], ApiError>
where
    R: VersionedResource + ?Sized,
{
    let etag = resource.fingerprint().etag();
    let value = HeaderValue::from_str(&etag).map_err(|e| {
        tracing::error!(error = %e, etag = %etag, "Fingerprint is not a valid header value");
        ApiError::internal("internal_error", "Failed to render ETag")
    })?;
    Ok([(ETAG, value)])
}

fn precondition_error(error: PreconditionError) -> ApiError {
    match error {
        PreconditionError::Missing { header } => ApiError::precondition_failed(
            "precondition_required",
            format!("The {header} header is required to modify this resource"),
        )
        .with_details(vec![FieldError::new(header, "header is required")]),
        PreconditionError::Mismatch {
            header,
            expected,
            supplied,
        } => ApiError::precondition_failed(
            "precondition_failed",
            "The resource was modified since it was last read; fetch it again and retry",
        )
        .with_details(vec![
            FieldError::new(header, format!("supplied {supplied}")),
            FieldError::new("ETag", format!("current \"{expected}\"")),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::Path,
        http::{Request, StatusCode},
        response::IntoResponse,
        routing::put,
        Router,
    };
    use chrono::{DateTime, Utc};
    use protrack_versioning::fingerprint_of;
    use tower::ServiceExt;

    use super::*;
    use crate::api::error::ProblemDetails;

    struct Prototype {
        updated_at: Option<DateTime<Utc>>,
    }

    impl VersionedResource for Prototype {
        fn last_modified(&self) -> Option<DateTime<Utc>> {
            self.updated_at
        }
    }

    fn stored() -> Prototype {
        Prototype {
            updated_at: DateTime::from_timestamp(1_700_000_000, 250_000_000),
        }
    }

    async fn update(
        Path(allow_wildcard): Path<bool>,
        if_match: IfMatch,
    ) -> Result<impl IntoResponse, ApiError> {
        let current = stored();
        check_if_match(&current, &if_match, allow_wildcard, "req_test")?;

        let updated = Prototype {
            updated_at: DateTime::from_timestamp(1_700_000_100, 0),
        };
        Ok((etag_header(&updated)?, StatusCode::OK))
    }

    fn app() -> Router {
        Router::new().route("/prototypes/{allow_wildcard}", put(update))
    }

    async fn send(allow_wildcard: bool, if_match: Option<&str>) -> axum::response::Response {
        let mut request = Request::builder()
            .method("PUT")
            .uri(format!("/prototypes/{allow_wildcard}"));
        if let Some(value) = if_match {
            request = request.header(IF_MATCH, value);
        }
        app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn problem(response: axum::response::Response) -> ProblemDetails {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_matching_if_match_is_accepted_and_new_etag_returned() {
        let etag = stored().fingerprint().etag();
        let response = send(false, Some(&etag)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let expected = fingerprint_of(DateTime::from_timestamp(1_700_000_100, 0)).etag();
        assert_eq!(response.headers().get(ETAG).unwrap(), expected.as_str());
    }

    #[tokio::test]
    async fn test_missing_if_match_is_412() {
        let response = send(false, None).await;

        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let body = problem(response).await;
        assert_eq!(body.code, "precondition_required");
        assert_eq!(body.request_id, "req_test");
        let details = body.details.unwrap();
        assert_eq!(details[0].field, "If-Match");
    }

    #[tokio::test]
    async fn test_stale_if_match_is_412_with_expected_and_supplied() {
        let stale = fingerprint_of(DateTime::from_timestamp(1_600_000_000, 0)).etag();
        let response = send(false, Some(&stale)).await;

        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let body = problem(response).await;
        assert_eq!(body.code, "precondition_failed");
        let details = body.details.unwrap();
        assert!(details[0].message.contains(&stale));
        assert!(details[1]
            .message
            .contains(stored().fingerprint().as_str()));
    }

    #[tokio::test]
    async fn test_weak_etag_is_412() {
        let weak = format!("W/{}", stored().fingerprint().etag());
        let response = send(true, Some(&weak)).await;

        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let body = problem(response).await;
        assert_eq!(body.code, "precondition_failed");
    }

    #[tokio::test]
    async fn test_wildcard_only_where_allowed() {
        assert_eq!(send(true, Some("*")).await.status(), StatusCode::OK);
        assert_eq!(
            send(false, Some("*")).await.status(),
            StatusCode::PRECONDITION_FAILED
        );
    }

    #[test]
    fn test_if_match_from_header() {
        assert_eq!(IfMatch::from_header(None).0, PreconditionToken::Absent);
        assert_eq!(IfMatch::from_header(Some("*")).0, PreconditionToken::Wildcard);
    }
}
