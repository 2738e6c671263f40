//! Core types for business verification
//!
//! Data flow per request:
//! - `BusinessId` is parsed from the URL path
//! - each source adapter turns a `VerificationRequest` into one `SourceOutcome`
//! - the aggregator collects `SourceResult`s in declaration order and scores them
//!   into a `VerificationReport`

use chrono::{DateTime, Utc};
use pulse_common::Business;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Longest identifier accepted by the verify route
pub const MAX_BUSINESS_ID_LEN: usize = 128;

// ============================================================================
// Identifier
// ============================================================================

/// Opaque business identifier (license number or internal id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BusinessId(String);

impl BusinessId {
    /// Validate and wrap a raw identifier
    ///
    /// The identifier is trimmed; it must be non-empty, at most
    /// [`MAX_BUSINESS_ID_LEN`] characters, and free of control characters.
    pub fn parse(raw: &str) -> Result<Self, VerifyError> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(VerifyError::InvalidIdentifier(
                "business id must not be empty".to_string(),
            ));
        }

        if trimmed.chars().count() > MAX_BUSINESS_ID_LEN {
            return Err(VerifyError::InvalidIdentifier(format!(
                "business id longer than {} characters",
                MAX_BUSINESS_ID_LEN
            )));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(VerifyError::InvalidIdentifier(
                "business id contains control characters".to_string(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input handed to every source adapter
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub business_id: BusinessId,
    /// Directory entry for this id, when the store has one
    pub profile: Option<Business>,
}

impl VerificationRequest {
    pub fn new(business_id: BusinessId, profile: Option<Business>) -> Self {
        Self {
            business_id,
            profile,
        }
    }

    /// Municipal license number to query, falling back to the raw identifier
    pub fn license_number(&self) -> &str {
        self.profile
            .as_ref()
            .and_then(|p| p.license_number.as_deref())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(self.business_id.as_str())
    }

    /// Known business name, if any
    pub fn known_name(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .map(|p| p.name.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

// ============================================================================
// Source outcomes
// ============================================================================

/// Registry record normalized into the canonical field set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BusinessRecord {
    pub name: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub expiry: Option<String>,
}

impl BusinessRecord {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.status.is_none() && self.expiry.is_none()
    }
}

/// Result of querying one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    /// Source holds a record; `matches` tells whether it corroborates the business
    Found { record: BusinessRecord, matches: bool },
    /// Source has no record for this business
    NotFound,
    /// Source could not be queried
    Error { reason: String },
}

impl SourceOutcome {
    pub fn error(reason: impl Into<String>) -> Self {
        SourceOutcome::Error {
            reason: reason.into(),
        }
    }

    /// True for `Found { matches: true, .. }`
    pub fn is_match(&self) -> bool {
        matches!(self, SourceOutcome::Found { matches: true, .. })
    }

    /// Status label used in reports and logs
    pub fn status_label(&self) -> &'static str {
        match self {
            SourceOutcome::Found { matches: true, .. } => "verified",
            SourceOutcome::Found { matches: false, .. } => "mismatch",
            SourceOutcome::NotFound => "not_found",
            SourceOutcome::Error { .. } => "error",
        }
    }
}

/// Outcome of one source together with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResult {
    /// Stable source id (config key, e.g. "municipal_registry")
    pub source_id: String,
    /// Human-readable source name
    pub source_name: String,
    pub checked_at: DateTime<Utc>,
    pub outcome: SourceOutcome,
}

/// Request-scoped aggregate verification result
#[derive(Debug, Clone)]
pub struct VerificationReport {
    pub business_id: BusinessId,
    pub verified: bool,
    /// 0..=100
    pub quality_score: u8,
    /// One entry per configured source, in declaration order
    pub sources: Vec<SourceResult>,
    pub generated_at: DateTime<Utc>,
}

// ============================================================================
// Errors
// ============================================================================

/// Failure inside a source adapter
///
/// Never escapes the adapter boundary: adapters convert it to
/// [`SourceOutcome::Error`].
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network failure or timeout
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx HTTP status
    #[error("Upstream returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// 2xx response carrying an error payload
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Adapter cannot run with the current configuration or inputs
    #[error("Not configured: {0}")]
    NotConfigured(String),
}

impl AdapterError {
    /// Network failures, 5xx and 429 are worth retrying; the rest are deterministic
    pub fn is_retryable(&self) -> bool {
        match self {
            AdapterError::Transport(_) => true,
            AdapterError::Status { code, .. } => *code >= 500 || *code == 429,
            _ => false,
        }
    }
}

/// Verification request failure surfaced to HTTP callers
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Malformed identifier (400)
    #[error("Invalid business id: {0}")]
    InvalidIdentifier(String),

    /// Business store could not be read (500)
    #[error("Business store unavailable: {0}")]
    Store(String),
}
