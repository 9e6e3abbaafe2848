//! Fixed-window rate limiting keyed by client and route class.
//!
//! # Algorithm
//!
//! For each `(route_class, client_key)`:
//!
//! 1. No window, or `now - window_start >= window` → start a new window
//!    with count 1 and admit.
//! 2. Otherwise increment the count and admit iff `count <= max_requests`.
//!
//! A rejection only affects the current request; the next window starts
//! clean.
//!
//! # Concurrency
//!
//! Windows live in a sharded [`DashMap`]. The increment-and-compare runs
//! while holding the entry's shard lock, so concurrent requests from one
//! client cannot both observe the same count.
//!
//! # Memory
//!
//! Idle windows are dropped by [`RateLimitGuard::sweep`]; servers should
//! sweep on a timer. [`RateLimitConfig::max_tracked_keys`] bounds the map:
//! a client with no window is only admitted while the map is below it.
//! At the bound, `admit` sweeps inline (at most once per
//! [`INLINE_SWEEP_INTERVAL`]) and, if nothing was freed, rejects the new
//! client. Clients that already hold a window are unaffected.

use crate::config::{RateLimitConfig, WindowPolicy};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

/// Minimum spacing between sweeps triggered from `admit`.
pub const INLINE_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Category of endpoint with its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Any API route.
    General,
    /// Ticket verification and check-in routes.
    Verification,
}

impl RouteClass {
    /// Stable identifier, used as a metrics label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Verification => "verification",
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed.
    Admitted {
        /// Requests allowed per window.
        limit: u32,
        /// Requests left in the current window.
        remaining: u32,
        /// When the current window ends.
        resets_at: DateTime<Utc>,
    },
    /// Request must be refused.
    Rejected {
        /// Requests allowed per window.
        limit: u32,
        /// Time until the current window ends.
        retry_after: Duration,
        /// When the current window ends.
        resets_at: DateTime<Utc>,
    },
}

impl Admission {
    /// Whether the request was admitted.
    #[must_use]
    pub const fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    route_class: RouteClass,
    client_key: String,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: DateTime<Utc>,
    count: u32,
}

impl Window {
    const fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            count: 0,
        }
    }

    fn has_elapsed(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now.signed_duration_since(self.started_at) >= window
    }

    fn ends_at(&self, window: chrono::Duration) -> DateTime<Utc> {
        self.started_at
            .checked_add_signed(window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

fn until(now: DateTime<Utc>, later: DateTime<Utc>) -> Duration {
    later.signed_duration_since(now).to_std().unwrap_or_default()
}

/// Process-local admission guard.
///
/// Share one instance per process behind an `Arc`; independent instances
/// keep independent state.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use qrpass_core::{RateLimitConfig, RateLimitGuard, RouteClass};
///
/// let guard = RateLimitGuard::new(RateLimitConfig::default());
/// let admission = guard.admit(RouteClass::Verification, "203.0.113.7", Utc::now());
/// assert!(admission.is_admitted());
/// ```
#[derive(Debug)]
pub struct RateLimitGuard {
    config: RateLimitConfig,
    windows: DashMap<WindowKey, Window>,
    /// Millisecond timestamp of the last inline sweep.
    last_inline_sweep_ms: AtomicI64,
}

impl RateLimitGuard {
    /// Create a guard with the given limits.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            last_inline_sweep_ms: AtomicI64::new(i64::MIN),
        }
    }

    /// Policy applied to a route class.
    #[must_use]
    pub const fn policy(&self, route_class: RouteClass) -> WindowPolicy {
        match route_class {
            RouteClass::General => self.config.general,
            RouteClass::Verification => self.config.verification,
        }
    }

    /// Count a request and decide whether it is admitted.
    ///
    /// A client without a live window is rejected while the guard tracks
    /// `max_tracked_keys` windows and an inline sweep frees none of them.
    pub fn admit(&self, route_class: RouteClass, client_key: &str, now: DateTime<Utc>) -> Admission {
        let policy = self.policy(route_class);
        let key = WindowKey {
            route_class,
            client_key: client_key.to_string(),
        };

        if !self.windows.contains_key(&key) && !self.has_room(now) {
            let retry_after = INLINE_SWEEP_INTERVAL;
            let next_sweep = chrono::Duration::from_std(retry_after)
                .unwrap_or_else(|_| chrono::Duration::zero());
            tracing::warn!(
                route_class = %route_class,
                client_key = %client_key,
                tracked_keys = self.windows.len(),
                max_tracked_keys = self.config.max_tracked_keys,
                "Rate limiter at capacity, refusing new client"
            );
            return Admission::Rejected {
                limit: policy.max_requests,
                retry_after,
                resets_at: now
                    .checked_add_signed(next_sweep)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            };
        }

        let admission = {
            let mut window = self
                .windows
                .entry(key)
                .or_insert_with(|| Window::fresh(now));

            if window.has_elapsed(now, policy.window) {
                *window = Window::fresh(now);
            }
            window.count = window.count.saturating_add(1);

            let resets_at = window.ends_at(policy.window);
            if window.count <= policy.max_requests {
                Admission::Admitted {
                    limit: policy.max_requests,
                    remaining: policy.max_requests - window.count,
                    resets_at,
                }
            } else {
                Admission::Rejected {
                    limit: policy.max_requests,
                    retry_after: until(now, resets_at),
                    resets_at,
                }
            }
        };

        if let Admission::Rejected { retry_after, .. } = admission {
            tracing::warn!(
                rate_limit_exceeded = true,
                route_class = %route_class,
                client_key = %client_key,
                max_requests = policy.max_requests,
                retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                "Rate limit exceeded"
            );
        }

        admission
    }

    /// Whether a new window may be created, sweeping first if the guard is
    /// full and no inline sweep ran within [`INLINE_SWEEP_INTERVAL`].
    fn has_room(&self, now: DateTime<Utc>) -> bool {
        let max = self.config.max_tracked_keys;
        if self.windows.len() < max {
            return true;
        }

        let now_ms = now.timestamp_millis();
        let interval_ms = i64::try_from(INLINE_SWEEP_INTERVAL.as_millis()).unwrap_or(i64::MAX);
        let last = self.last_inline_sweep_ms.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) < interval_ms {
            return false;
        }
        // One caller per interval does the scan.
        if self
            .last_inline_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            return false;
        }

        self.sweep(now);
        self.windows.len() < max
    }

    /// Drop every window that has elapsed at `now`.
    ///
    /// Returns the number of windows removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|key, window| {
            !window.has_elapsed(now, self.policy(key.route_class).window)
        });
        let removed = before.saturating_sub(self.windows.len());

        if removed > 0 {
            tracing::debug!(
                removed = removed,
                remaining = self.windows.len(),
                "Swept idle rate limit windows"
            );
        }

        removed
    }

    /// Forget the window for one client, e.g. after an operator override.
    pub fn reset(&self, route_class: RouteClass, client_key: &str) {
        self.windows.remove(&WindowKey {
            route_class,
            client_key: client_key.to_string(),
        });

        tracing::info!(
            route_class = %route_class,
            client_key = %client_key,
            "Reset rate limit window"
        );
    }

    /// Number of windows currently held.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
