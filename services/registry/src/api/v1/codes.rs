//! Item code allocation endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use protrack_id::{CounterKey, EvidenceYearId, ItemCode, LocationId};
use serde::{Deserialize, Serialize};

use crate::allocation::AllocationError;
use crate::api::error::ApiError;
use crate::api::request_context::RequestContext;
use crate::state::AppState;

/// Create code routes, nested under
/// `/locations/{location_id}/evidence-years/{evidence_year_id}`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/codes", post(allocate_code))
        .route("/counter", get(get_counter))
}

// =============================================================================
// Request/Response Types
// =============================================================================

/// A freshly allocated item code.
#[derive(Debug, Serialize, Deserialize)]
pub struct CodeResponse {
    /// The 4 character code.
    pub code: ItemCode,

    /// Counter value the code encodes.
    pub counter: i64,

    pub location_id: LocationId,
    pub evidence_year_id: EvidenceYearId,
}

/// Current state of a counter.
#[derive(Debug, Serialize, Deserialize)]
pub struct CounterResponse {
    pub location_id: LocationId,
    pub evidence_year_id: EvidenceYearId,

    /// Last allocated value; absent if nothing was allocated yet.
    pub last_value: Option<i64>,

    /// Last allocated code, when the value is still encodable.
    pub last_code: Option<ItemCode>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Allocate the next code for a location and evidence year.
///
/// POST /v1/locations/{location_id}/evidence-years/{evidence_year_id}/codes
async fn allocate_code(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((location_id, evidence_year_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = ctx.request_id;
    let key = parse_key(&location_id, &evidence_year_id, &request_id)?;

    let code = state
        .allocator()
        .allocate(key)
        .await
        .map_err(|e| allocation_error(e, &request_id))?;

    tracing::info!(
        request_id = %request_id,
        location_id = key.location_id.value(),
        evidence_year_id = key.evidence_year_id.value(),
        code = %code,
        "Item code allocated"
    );

    Ok((
        StatusCode::CREATED,
        Json(CodeResponse {
            code,
            counter: code.value(),
            location_id: key.location_id,
            evidence_year_id: key.evidence_year_id,
        }),
    ))
}

/// Read a counter without advancing it.
///
/// GET /v1/locations/{location_id}/evidence-years/{evidence_year_id}/counter
async fn get_counter(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path((location_id, evidence_year_id)): Path<(String, String)>,
) -> Result<Json<CounterResponse>, ApiError> {
    let request_id = ctx.request_id;
    let key = parse_key(&location_id, &evidence_year_id, &request_id)?;

    let last_value = state
        .allocator()
        .current(key)
        .await
        .map_err(|e| allocation_error(e, &request_id))?;

    Ok(Json(CounterResponse {
        location_id: key.location_id,
        evidence_year_id: key.evidence_year_id,
        last_value,
        last_code: last_value.and_then(|v| ItemCode::encode(v).ok()),
    }))
}

// =============================================================================
// Helpers
// =============================================================================

fn parse_key(
    location_id: &str,
    evidence_year_id: &str,
    request_id: &str,
) -> Result<CounterKey, ApiError> {
    let location_id: LocationId = location_id.parse().map_err(|e| {
        ApiError::bad_request("invalid_location_id", format!("{e}")).with_request_id(request_id)
    })?;
    let evidence_year_id: EvidenceYearId = evidence_year_id.parse().map_err(|e| {
        ApiError::bad_request("invalid_evidence_year_id", format!("{e}"))
            .with_request_id(request_id)
    })?;

    Ok(CounterKey {
        location_id,
        evidence_year_id,
    })
}

fn allocation_error(error: AllocationError, request_id: &str) -> ApiError {
    let key = error.key();
    match error {
        AllocationError::KeyExhausted { .. } => {
            tracing::error!(
                error = %error,
                request_id = %request_id,
                %key,
                "Item codes exhausted; the key must be retired"
            );
            ApiError::internal("key_exhausted", "Failed to allocate item code")
                .with_retryable(false)
                .with_request_id(request_id)
        }
        AllocationError::GateTimeout { .. } => {
            tracing::warn!(error = %error, request_id = %request_id, %key, "Allocation gate busy");
            ApiError::service_unavailable("allocation_busy", "Allocation is busy; retry shortly")
                .with_retry_after_seconds(1)
                .with_request_id(request_id)
        }
        AllocationError::Persistence { .. } | AllocationError::Aborted { .. } => {
            tracing::error!(
                error = %error,
                request_id = %request_id,
                %key,
                "Failed to allocate item code"
            );
            ApiError::internal("internal_error", "Failed to allocate item code")
                .with_retryable(true)
                .with_request_id(request_id)
        }
    }
}
