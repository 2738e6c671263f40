//! Issue-report intake linked from every verification report
//!
//! `POST /report-issue?business_id=<id>` with `{description, reporter_email?}`

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{issue_reports, IssueReport};
use crate::error::{ApiError, ApiResult};
use crate::report::REPORT_ISSUE_PATH;
use crate::types::BusinessId;
use crate::AppState;

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_LEN: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct ReportIssueQuery {
    pub business_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportIssueRequest {
    pub description: String,
    #[serde(default)]
    pub reporter_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReportIssueResponse {
    pub id: String,
    pub business_id: String,
    pub status: &'static str,
}

/// POST /report-issue
pub async fn report_issue(
    State(state): State<AppState>,
    Query(query): Query<ReportIssueQuery>,
    Json(request): Json<ReportIssueRequest>,
) -> ApiResult<(StatusCode, Json<ReportIssueResponse>)> {
    let business_id = BusinessId::parse(query.business_id.as_deref().unwrap_or_default())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let description = request.description.trim();
    if description.is_empty() {
        return Err(ApiError::BadRequest("description must not be empty".to_string()));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ApiError::BadRequest(format!(
            "description longer than {} characters",
            MAX_DESCRIPTION_LEN
        )));
    }

    let reporter_email = request
        .reporter_email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &reporter_email {
        if !email.contains('@') {
            return Err(ApiError::BadRequest(format!("invalid reporter_email '{}'", email)));
        }
    }

    let report = IssueReport::new(business_id.as_str(), description, reporter_email);
    issue_reports::insert_issue_report(&state.db, &report).await?;

    info!(business_id = %business_id, report_id = %report.id, "Issue report received");

    Ok((
        StatusCode::CREATED,
        Json(ReportIssueResponse {
            id: report.id,
            business_id: report.business_id,
            status: "received",
        }),
    ))
}

/// Build issue-report routes
pub fn report_issue_routes() -> Router<AppState> {
    Router::new().route(REPORT_ISSUE_PATH, post(report_issue))
}
