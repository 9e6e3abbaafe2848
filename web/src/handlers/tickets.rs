//! Ticket verification and check-in endpoints.
//!
//! Both routes sit behind the general and verification rate-limit layers;
//! a request that reaches these handlers has already been admitted.

use crate::error::AppError;
use crate::extractors::{ClientIp, CorrelationId};
use crate::metrics;
use crate::state::AppState;
use crate::WebResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use qrpass_core::{verify, CheckIn, VerificationFailure, VerifiedTicket};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /api/v1/tickets/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTicketRequest {
    /// Token scanned from the QR code.
    pub token: String,
    /// Event the scanning gate belongs to.
    pub event_id: String,
}

/// Body of `POST /api/v1/events/:event_id/check-in`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    /// Token scanned from the QR code.
    pub token: String,
}

/// Verify a ticket without recording entry.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/tickets/verify
/// {"token": "...", "eventId": "evt-1"}
/// ```
///
/// # Errors
///
/// - 401 `INVALID_TOKEN`, 403 `WRONG_EVENT`, 410 `TICKET_EXPIRED`
/// - 500 if the verification task fails to complete
pub async fn verify_ticket(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    Json(request): Json<VerifyTicketRequest>,
) -> WebResult<Json<VerifiedTicket>> {
    let verified = run_verification(&state, request.token, request.event_id).await?;

    tracing::debug!(
        correlation_id = %correlation_id.0,
        client_ip = %client_ip.0,
        event_id = %verified.event_id,
        user_id = verified.user_id,
        "Ticket verified"
    );

    Ok(Json(verified))
}

/// Verify a ticket and record the holder's entry.
///
/// # Endpoint
///
/// ```text
/// POST /api/v1/events/:event_id/check-in
/// {"token": "..."}
/// ```
///
/// # Errors
///
/// - verification failures as for [`verify_ticket`]
/// - 409 `ALREADY_CHECKED_IN` on a repeat scan
/// - 503 if the attendance store is unavailable
pub async fn check_in(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    correlation_id: CorrelationId,
    client_ip: ClientIp,
    Json(request): Json<CheckInRequest>,
) -> WebResult<(StatusCode, Json<CheckIn>)> {
    let verified = run_verification(&state, request.token, event_id).await?;

    let recorded = state
        .attendance
        .record_once(&verified, state.clock.now())
        .await;
    metrics::record_check_in(recorded.as_ref().map(|_| ()));

    match recorded {
        Ok(check_in) => {
            tracing::info!(
                correlation_id = %correlation_id.0,
                client_ip = %client_ip.0,
                event_id = %check_in.event_id,
                user_id = check_in.user_id,
                "Check-in recorded"
            );
            Ok((StatusCode::CREATED, Json(check_in)))
        }
        Err(err) => {
            tracing::info!(
                correlation_id = %correlation_id.0,
                event_id = %verified.event_id,
                user_id = verified.user_id,
                error = %err,
                "Check-in refused"
            );
            Err(err.into())
        }
    }
}

/// Run [`verify`] off the async reactor and record its outcome.
async fn run_verification(
    state: &AppState,
    token: String,
    event_id: String,
) -> WebResult<VerifiedTicket> {
    let cipher = Arc::clone(&state.cipher);
    let now = state.clock.now();

    let result = tokio::task::spawn_blocking(move || verify(&token, &cipher, &event_id, now))
        .await
        .map_err(|e| {
            AppError::internal("Verification did not complete").with_source(anyhow::Error::new(e))
        })?;

    metrics::record_verification(result.as_ref().map(|_| ()).map_err(|f| *f));
    result.map_err(|failure: VerificationFailure| {
        tracing::debug!(outcome = failure.as_str(), "Ticket rejected");
        AppError::from(failure)
    })
}
