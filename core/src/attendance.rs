//! Attendance recording contract.
//!
//! Verification proves a token is genuine; it does not stop the same token
//! being scanned twice. Gates pair [`crate::verifier::verify`] with an
//! [`AttendanceRecorder`] whose `record_once` is atomic per
//! `(event_id, user_id)`.
//!
//! Production deployments back this trait with their own data store.
//! [`InMemoryAttendance`] is the process-local implementation used by the
//! bundled server and tests.

use crate::verifier::VerifiedTicket;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A recorded entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckIn {
    /// Ticket holder.
    pub user_id: i64,
    /// Holder display name.
    pub user_name: String,
    /// Event entered.
    pub event_id: String,
    /// Event display name.
    pub event_name: String,
    /// When the entry was recorded.
    pub checked_in_at: DateTime<Utc>,
}

/// Failure to record attendance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttendanceError {
    /// The holder has already entered this event.
    #[error("Ticket already checked in at {checked_in_at}")]
    AlreadyCheckedIn {
        /// Time of the first check-in
        checked_in_at: DateTime<Utc>,
    },

    /// Backing store is unreachable or failed.
    #[error("Attendance store unavailable: {0}")]
    Unavailable(String),
}

/// Record-once store for check-ins.
///
/// # Security
///
/// `record_once` MUST be atomic. Two concurrent scans of one ticket must
/// yield exactly one `Ok`.
#[async_trait]
pub trait AttendanceRecorder: Send + Sync {
    /// Record that `ticket` entered at `at`, unless it already has.
    ///
    /// # Errors
    ///
    /// - [`AttendanceError::AlreadyCheckedIn`] on a repeat scan
    /// - [`AttendanceError::Unavailable`] if the store fails
    async fn record_once(
        &self,
        ticket: &VerifiedTicket,
        at: DateTime<Utc>,
    ) -> Result<CheckIn, AttendanceError>;

    /// Look up an existing check-in.
    ///
    /// # Errors
    ///
    /// Returns [`AttendanceError::Unavailable`] if the store fails.
    async fn find(&self, event_id: &str, user_id: i64)
        -> Result<Option<CheckIn>, AttendanceError>;
}

/// In-process attendance store.
///
/// Entries are never evicted; size is bounded by the number of tickets
/// presented while the process runs.
#[derive(Debug, Default)]
pub struct InMemoryAttendance {
    check_ins: DashMap<(String, i64), CheckIn>,
}

impl InMemoryAttendance {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded check-ins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.check_ins.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.check_ins.is_empty()
    }
}

#[async_trait]
impl AttendanceRecorder for InMemoryAttendance {
    async fn record_once(
        &self,
        ticket: &VerifiedTicket,
        at: DateTime<Utc>,
    ) -> Result<CheckIn, AttendanceError> {
        match self.check_ins.entry((ticket.event_id.clone(), ticket.user_id)) {
            Entry::Occupied(existing) => Err(AttendanceError::AlreadyCheckedIn {
                checked_in_at: existing.get().checked_in_at,
            }),
            Entry::Vacant(slot) => {
                let check_in = CheckIn {
                    user_id: ticket.user_id,
                    user_name: ticket.user_name.clone(),
                    event_id: ticket.event_id.clone(),
                    event_name: ticket.event_name.clone(),
                    checked_in_at: at,
                };
                slot.insert(check_in.clone());
                Ok(check_in)
            }
        }
    }

    async fn find(
        &self,
        event_id: &str,
        user_id: i64,
    ) -> Result<Option<CheckIn>, AttendanceError> {
        Ok(self
            .check_ins
            .get(&(event_id.to_string(), user_id))
            .map(|entry| entry.value().clone()))
    }
}
