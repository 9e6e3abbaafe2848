//! Metric names and recording helpers.
//!
//! Recording goes through the `metrics` facade; with no recorder installed
//! (tests, embedding without the server binary) every call is a no-op.

use metrics::{counter, describe_counter, describe_gauge, gauge};
use qrpass_core::{AttendanceError, RouteClass, VerificationFailure};

/// Verification attempts, labelled by `outcome`.
pub const VERIFICATIONS_TOTAL: &str = "qrpass_verifications_total";

/// Requests refused by the rate-limit guard, labelled by `route_class`.
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "qrpass_rate_limit_rejections_total";

/// Check-in attempts on verified tickets, labelled by `outcome`.
pub const CHECK_INS_TOTAL: &str = "qrpass_check_ins_total";

/// Live `(route class, client)` windows held by the guard.
pub const RATE_LIMIT_TRACKED_KEYS: &str = "qrpass_rate_limit_tracked_keys";

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        VERIFICATIONS_TOTAL,
        "Total number of ticket verifications by outcome"
    );
    describe_counter!(
        RATE_LIMIT_REJECTIONS_TOTAL,
        "Total number of requests rejected by the rate limiter"
    );
    describe_counter!(CHECK_INS_TOTAL, "Total number of check-in attempts by outcome");
    describe_gauge!(
        RATE_LIMIT_TRACKED_KEYS,
        "Number of rate-limit windows currently tracked"
    );
}

/// Record the result of one verification.
pub fn record_verification(result: Result<(), VerificationFailure>) {
    let outcome = match result {
        Ok(()) => "verified",
        Err(failure) => failure.as_str(),
    };
    counter!(VERIFICATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a request refused by the guard.
pub fn record_rate_limit_rejection(route_class: RouteClass) {
    counter!(RATE_LIMIT_REJECTIONS_TOTAL, "route_class" => route_class.as_str()).increment(1);
}

/// Record the result of one `record_once` call.
pub fn record_check_in(result: Result<(), &AttendanceError>) {
    let outcome = match result {
        Ok(()) => "recorded",
        Err(AttendanceError::AlreadyCheckedIn { .. }) => "already_checked_in",
        Err(AttendanceError::Unavailable(_)) => "unavailable",
    };
    counter!(CHECK_INS_TOTAL, "outcome" => outcome).increment(1);
}

/// Publish the guard's current window count.
#[allow(clippy::cast_precision_loss)]
pub fn record_tracked_keys(tracked: usize) {
    gauge!(RATE_LIMIT_TRACKED_KEYS).set(tracked as f64);
}
