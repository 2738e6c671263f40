//! Collaborators of the verify route
//!
//! [`BusinessStore`] supplies the directory entry (name, address, license and
//! company numbers) adapters search with; [`AuditSink`] records served
//! reports. Both are traits so the HTTP layer can be driven with in-memory
//! fakes.

use crate::db::{businesses, verification_log};
use crate::types::VerificationReport;
use async_trait::async_trait;
use pulse_common::{Business, Result};
use sqlx::SqlitePool;

#[async_trait]
pub trait BusinessStore: Send + Sync {
    /// Directory entry for an id or municipal license number
    ///
    /// `Ok(None)` means the directory does not know the business; `Err`
    /// means the store itself is unavailable.
    async fn get_business_by_id(&self, id: &str) -> Result<Option<Business>>;
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_verification(&self, report: &VerificationReport) -> Result<()>;
}

/// SQLite-backed store and audit sink
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BusinessStore for SqliteStore {
    async fn get_business_by_id(&self, id: &str) -> Result<Option<Business>> {
        businesses::find_by_id_or_license(&self.pool, id).await
    }
}

#[async_trait]
impl AuditSink for SqliteStore {
    async fn log_verification(&self, report: &VerificationReport) -> Result<()> {
        verification_log::insert_verification(&self.pool, report).await?;
        Ok(())
    }
}
