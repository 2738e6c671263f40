//! Business directory endpoints
//!
//! - `GET /api/businesses?page=N&city=..` paginated listing (20/page)
//! - `GET /api/businesses/:id` one directory entry
//! - `GET /api/businesses/:id/verifications` recent audit-log entries

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use pulse_common::Business;
use serde::{Deserialize, Serialize};

use crate::db::{businesses, verification_log, VerificationLogEntry};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, PAGE_SIZE};
use crate::AppState;

/// Entries returned by the history endpoint
const HISTORY_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: i64,
    pub city: Option<String>,
}

fn default_page() -> i64 {
    1
}

#[derive(Debug, Serialize)]
pub struct BusinessListResponse {
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub businesses: Vec<Business>,
}

#[derive(Debug, Serialize)]
pub struct VerificationHistoryResponse {
    pub business_id: String,
    pub verifications: Vec<VerificationLogEntry>,
}

/// GET /api/businesses
pub async fn list_businesses(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<BusinessListResponse>> {
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let total = businesses::count_businesses(&state.db, city).await?;
    let pagination = calculate_pagination(total, query.page);
    let rows = businesses::list_businesses(&state.db, city, PAGE_SIZE, pagination.offset).await?;

    Ok(Json(BusinessListResponse {
        total,
        page: pagination.page,
        page_size: PAGE_SIZE,
        total_pages: pagination.total_pages,
        businesses: rows,
    }))
}

/// GET /api/businesses/:id
pub async fn get_business(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Business>> {
    businesses::get_business(&state.db, &id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("business '{}'", id)))
}

/// GET /api/businesses/:id/verifications
pub async fn verification_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<VerificationHistoryResponse>> {
    let verifications =
        verification_log::recent_for_business(&state.db, &id, HISTORY_LIMIT).await?;

    Ok(Json(VerificationHistoryResponse {
        business_id: id,
        verifications,
    }))
}

/// Build business directory routes
pub fn business_routes() -> Router<AppState> {
    Router::new()
        .route("/api/businesses", get(list_businesses))
        .route("/api/businesses/:id", get(get_business))
        .route("/api/businesses/:id/verifications", get(verification_history))
}
