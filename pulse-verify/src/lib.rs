//! pulse-verify library interface
//!
//! Business verification service: queries municipal, companies-registrar and
//! places sources for a business, scores the combined evidence and serves the
//! result as a JSON report with "verify it yourself" links.

pub mod aggregator;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod pagination;
pub mod report;
pub mod score;
pub mod sources;
pub mod store;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::aggregator::Aggregator;
use crate::report::ReportFormatter;
use crate::store::{AuditSink, BusinessStore, SqliteStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (directory listing, issue reports)
    pub db: SqlitePool,
    /// Directory lookups for the verify route
    pub store: Arc<dyn BusinessStore>,
    /// Best-effort audit log of served reports
    pub audit: Arc<dyn AuditSink>,
    pub aggregator: Arc<Aggregator>,
    pub formatter: Arc<ReportFormatter>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State backed by SQLite for both store and audit sink
    pub fn new(db: SqlitePool, aggregator: Aggregator) -> Self {
        let sqlite = Arc::new(SqliteStore::new(db.clone()));
        Self::with_collaborators(db, sqlite.clone(), sqlite, aggregator)
    }

    pub fn with_collaborators(
        db: SqlitePool,
        store: Arc<dyn BusinessStore>,
        audit: Arc<dyn AuditSink>,
        aggregator: Aggregator,
    ) -> Self {
        let formatter = ReportFormatter::from_config(aggregator.config());
        Self {
            db,
            store,
            audit,
            aggregator: Arc::new(aggregator),
            formatter: Arc::new(formatter),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::verify_routes())
        .merge(api::business_routes())
        .merge(api::report_issue_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
