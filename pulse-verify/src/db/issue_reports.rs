//! Issue reports submitted against verification results

use chrono::{DateTime, Utc};
use pulse_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct IssueReport {
    pub id: String,
    pub business_id: String,
    pub description: String,
    pub reporter_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl IssueReport {
    pub fn new(
        business_id: impl Into<String>,
        description: impl Into<String>,
        reporter_email: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            business_id: business_id.into(),
            description: description.into(),
            reporter_email,
            created_at: Utc::now(),
        }
    }
}

pub async fn insert_issue_report(pool: &SqlitePool, report: &IssueReport) -> Result<()> {
    retry_on_lock("insert_issue_report", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        sqlx::query(
            r#"
            INSERT INTO issue_reports (id, business_id, description, reporter_email, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.id)
        .bind(&report.business_id)
        .bind(&report.description)
        .bind(&report.reporter_email)
        .bind(report.created_at)
        .execute(pool)
        .await?;

        Ok::<(), Error>(())
    })
    .await
}

pub async fn get_issue_report(pool: &SqlitePool, id: &str) -> Result<Option<IssueReport>> {
    let report = sqlx::query_as::<_, IssueReport>(
        "SELECT id, business_id, description, reporter_email, created_at FROM issue_reports WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(report)
}
