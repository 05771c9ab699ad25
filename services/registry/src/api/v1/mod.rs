//! API v1 routes.

mod codes;

pub use codes::{CodeResponse, CounterResponse};

use axum::Router;

use crate::state::AppState;

/// Create API v1 routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Codes are scoped by counter key:
        // /v1/locations/{location_id}/evidence-years/{evidence_year_id}/codes
        .nest(
            "/locations/{location_id}/evidence-years/{evidence_year_id}",
            codes::routes(),
        )
}
