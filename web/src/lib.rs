//! Axum HTTP surface for QR Pass.
//!
//! Gate devices post scanned tokens here. Every API request passes the
//! rate-limit guard before any decryption is attempted, so a flood of
//! forged tokens costs the server a map lookup rather than an AES pass.
//!
//! # Request Flow
//!
//! 1. **Correlation ID** assigned and `http_request` span opened
//! 2. **General window** checked for the client address
//! 3. **Verification window** checked (ticket routes)
//! 4. **Verify** the token off the reactor (`spawn_blocking`)
//! 5. **Record** the check-in (check-in route)
//! 6. **Map result** to HTTP response
//!
//! # Example
//!
//! ```ignore
//! use qrpass_core::{InMemoryAttendance, RateLimitConfig, RateLimitGuard, SystemClock, TicketCipher};
//! use qrpass_web::{build_router, AppState};
//! use std::sync::Arc;
//!
//! let state = AppState::new(
//!     Arc::new(TicketCipher::from_secret("operator passphrase")),
//!     Arc::new(RateLimitGuard::new(RateLimitConfig::default())),
//!     Arc::new(SystemClock),
//!     Arc::new(InMemoryAttendance::new()),
//! );
//! let app = build_router(state);
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod router;
pub mod state;
pub mod sweeper;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{ClientIp, CorrelationId};
pub use middleware::{correlation_id_layer, RateLimitLayer, CORRELATION_ID_HEADER};
pub use router::build_router;
pub use state::AppState;
pub use sweeper::spawn_window_sweeper;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
