//! Database access for pulse-verify
//!
//! Schema creation lives in `pulse_common::db`; this module holds the
//! service's queries.

pub mod businesses;
pub mod issue_reports;
pub mod retry;
pub mod verification_log;

pub use issue_reports::IssueReport;
pub use verification_log::VerificationLogEntry;
