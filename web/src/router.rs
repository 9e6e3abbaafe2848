//! Route table.

use crate::handlers::{check_in, health_check, verify_ticket};
use crate::middleware::{correlation_id_layer, RateLimitLayer};
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use qrpass_core::RouteClass;
use tower_http::trace::TraceLayer;

/// Build the application router.
///
/// ```text
/// GET  /health                              no rate limit
/// POST /api/v1/tickets/verify               general + verification
/// POST /api/v1/events/:event_id/check-in    general + verification
/// ```
///
/// The general window is checked first; a request it refuses does not
/// count against the verification window.
pub fn build_router(state: AppState) -> Router {
    let tickets = Router::new()
        .route("/api/v1/tickets/verify", post(verify_ticket))
        .route("/api/v1/events/:event_id/check-in", post(check_in))
        .route_layer(RateLimitLayer::from_state(&state, RouteClass::Verification))
        .route_layer(RateLimitLayer::from_state(&state, RouteClass::General));

    Router::new()
        .route("/health", get(health_check))
        .merge(tickets)
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
