//! Verification audit log
//!
//! One row per served verification. `sources` holds a JSON array of
//! `{source_id, source_name, status, checked_at}` objects.

use chrono::{DateTime, Utc};
use pulse_common::time::to_iso8601;
use pulse_common::{Error, Result};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{Row, SqlitePool};

use super::retry::{retry_on_lock, DEFAULT_MAX_LOCK_WAIT_MS};
use crate::types::VerificationReport;

/// Stored verification summary
#[derive(Debug, Clone, Serialize)]
pub struct VerificationLogEntry {
    pub id: i64,
    pub business_id: String,
    pub verified: bool,
    pub quality_score: i64,
    pub sources: Value,
    pub created_at: DateTime<Utc>,
}

/// Append a report summary; returns the new row id
pub async fn insert_verification(pool: &SqlitePool, report: &VerificationReport) -> Result<i64> {
    let sources: Vec<Value> = report
        .sources
        .iter()
        .map(|s| {
            json!({
                "source_id": s.source_id,
                "source_name": s.source_name,
                "status": s.outcome.status_label(),
                "checked_at": to_iso8601(&s.checked_at),
            })
        })
        .collect();
    let sources = serde_json::to_string(&sources)
        .map_err(|e| Error::Internal(format!("Failed to serialize sources: {}", e)))?;
    let business_id = report.business_id.as_str();
    let quality_score = i64::from(report.quality_score);

    retry_on_lock("insert_verification", DEFAULT_MAX_LOCK_WAIT_MS, || async {
        let result = sqlx::query(
            r#"
            INSERT INTO verification_log (business_id, verified, quality_score, sources, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(business_id)
        .bind(report.verified)
        .bind(quality_score)
        .bind(&sources)
        .bind(report.generated_at)
        .execute(pool)
        .await?;

        Ok::<i64, Error>(result.last_insert_rowid())
    })
    .await
}

/// Most recent entries for one business, newest first
pub async fn recent_for_business(
    pool: &SqlitePool,
    business_id: &str,
    limit: i64,
) -> Result<Vec<VerificationLogEntry>> {
    let rows = sqlx::query(
        r#"
        SELECT id, business_id, verified, quality_score, sources, created_at
        FROM verification_log
        WHERE business_id = ?
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(business_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let sources: String = row.get("sources");
            let sources = serde_json::from_str(&sources)
                .map_err(|e| Error::Internal(format!("Failed to deserialize sources: {}", e)))?;
            Ok(VerificationLogEntry {
                id: row.get("id"),
                business_id: row.get("business_id"),
                verified: row.get("verified"),
                quality_score: row.get("quality_score"),
                sources,
                created_at: row.get("created_at"),
            })
        })
        .collect()
}
