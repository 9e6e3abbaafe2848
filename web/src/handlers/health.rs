//! Health check endpoint.
//!
//! Used by load balancers and monitoring systems to verify the service is
//! up. Not rate limited.

use axum::http::StatusCode;

/// Liveness check.
///
/// Returns 200 OK to indicate the service is running. Verification has no
/// external dependencies, so liveness is also readiness.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
