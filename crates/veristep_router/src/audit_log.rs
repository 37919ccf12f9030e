//! Finalized-job audit log with retention-based pruning.

use crate::verdict::Verdict;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use veristep_core::id::JobId;

/// One finalized job's outcome, retained for later inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// The finalized job.
    pub job_id: JobId,
    /// The terminal decision.
    pub verdict: Verdict,
    /// When the job was issued.
    pub issued_at: DateTime<Utc>,
    /// When the decision was reached.
    pub finalized_at: DateTime<Utc>,
}

/// In-memory audit log of finalized jobs.
///
/// Retention is a configuration choice, not a protocol invariant: entries
/// older than the window are dropped on `prune`.
#[derive(Debug, Clone)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
    retention: Duration,
}

impl AuditLog {
    /// Create a log with the given retention window.
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            entries: Vec::new(),
            retention,
        }
    }

    /// Append a finalized job.
    pub fn record(&mut self, entry: AuditLogEntry) {
        self.entries.push(entry);
    }

    /// All retained entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[AuditLogEntry] {
        &self.entries
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries finalized longer than the retention window ago.
    ///
    /// Returns the number of dropped entries.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let retention = self.retention;
        let before = self.entries.len();
        self.entries.retain(|e| now - e.finalized_at <= retention);
        before - self.entries.len()
    }
}
