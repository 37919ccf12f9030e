//! VERISTEP Router
//!
//! The verifier side of the commit-then-audit protocol: issues jobs,
//! verifies signed responses, derives unpredictable-but-verifiable audit
//! challenges from the committed transcript root, and resolves audits
//! against the disclosed root. Every protocol failure is a terminal
//! `Rejected(reason)` value - a security signal, never an exception.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit_log;
pub mod job;
pub mod router;
pub mod verdict;

// Re-exports
pub use audit_log::{AuditLog, AuditLogEntry};
pub use job::{JobRecord, JobState};
pub use router::{ResponseOutcome, Router, RouterConfig};
pub use verdict::{RejectReason, Verdict};
