//! Background reclamation of idle rate-limit windows.

use crate::metrics;
use qrpass_core::{Clock, RateLimitGuard};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest sweep period accepted.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Spawn a task that calls [`RateLimitGuard::sweep`] every `interval`.
///
/// The first sweep happens one interval after spawning. Each pass
/// publishes the tracked-key gauge. The task runs until the handle is
/// aborted or the runtime shuts down.
///
/// `interval` is clamped to [`MIN_SWEEP_INTERVAL`].
#[must_use]
pub fn spawn_window_sweeper(
    guard: Arc<RateLimitGuard>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> JoinHandle<()> {
    let period = interval.max(MIN_SWEEP_INTERVAL);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            guard.sweep(clock.now());
            metrics::record_tracked_keys(guard.tracked_keys());
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use qrpass_core::{RateLimitConfig, RouteClass};
    use qrpass_testing::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_reclaims_expired_windows() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let guard = Arc::new(RateLimitGuard::new(RateLimitConfig::default()));

        let _ = guard.admit(RouteClass::Verification, "203.0.113.1", start);
        let _ = guard.admit(RouteClass::General, "203.0.113.1", start);
        assert_eq!(guard.tracked_keys(), 2);

        let handle = spawn_window_sweeper(
            Arc::clone(&guard),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(30),
        );

        // Verification window (1 min) has ended, general (15 min) has not.
        clock.advance(ChronoDuration::minutes(2));
        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;

        assert_eq!(guard.tracked_keys(), 1);
        handle.abort();
    }
}
