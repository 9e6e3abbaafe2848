//! Application state for Axum handlers.

use qrpass_core::{AttendanceRecorder, Clock, RateLimitGuard, TicketCipher};
use std::fmt;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Every field is reference counted, so cloning per request is cheap and
/// all clones observe the same rate-limit windows and attendance records.
///
/// # Examples
///
/// ```ignore
/// use qrpass_core::{InMemoryAttendance, RateLimitConfig, RateLimitGuard, SystemClock, TicketCipher};
/// use qrpass_web::AppState;
/// use std::sync::Arc;
///
/// let state = AppState::new(
///     Arc::new(TicketCipher::from_secret("operator passphrase")),
///     Arc::new(RateLimitGuard::new(RateLimitConfig::default())),
///     Arc::new(SystemClock),
///     Arc::new(InMemoryAttendance::new()),
/// );
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Cipher keyed with the operator secret.
    pub cipher: Arc<TicketCipher>,
    /// Fixed-window admission guard shared by every rate-limit layer.
    pub guard: Arc<RateLimitGuard>,
    /// Time source for verification, admission and check-in stamps.
    pub clock: Arc<dyn Clock>,
    /// Record-once store for check-ins.
    pub attendance: Arc<dyn AttendanceRecorder>,
    /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer
    /// address. Only safe behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
}

impl AppState {
    /// Create application state. Forwarded headers are not trusted.
    #[must_use]
    pub fn new(
        cipher: Arc<TicketCipher>,
        guard: Arc<RateLimitGuard>,
        clock: Arc<dyn Clock>,
        attendance: Arc<dyn AttendanceRecorder>,
    ) -> Self {
        Self {
            cipher,
            guard,
            clock,
            attendance,
            trust_proxy_headers: false,
        }
    }

    /// Set whether forwarded headers identify the client.
    #[must_use]
    pub const fn with_trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("cipher", &self.cipher)
            .field("guard", &self.guard)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish_non_exhaustive()
    }
}
