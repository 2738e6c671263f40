//! Business verification endpoint
//!
//! `GET /api/verify/:id` aggregates every configured source into one report.
//! Adapter failures only lower the score; the route answers 400 for a
//! malformed id and 500 when the business directory cannot be read.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};

use crate::types::{BusinessId, VerificationRequest, VerifyError};
use crate::AppState;

/// Preflight cache lifetime
const CORS_MAX_AGE: Duration = Duration::from_secs(86_400);

/// GET /api/verify/:id
pub async fn verify_business(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    // Undecodable segments (e.g. invalid UTF-8) still get the verify error body
    let raw_id = match path {
        Ok(Path(raw_id)) => raw_id,
        Err(rejection) => {
            return verify_error(
                &state,
                "",
                VerifyError::InvalidIdentifier(rejection.body_text()),
            )
        }
    };

    let business_id = match BusinessId::parse(&raw_id) {
        Ok(id) => id,
        Err(e) => return verify_error(&state, &raw_id, e),
    };

    let profile = match state.store.get_business_by_id(business_id.as_str()).await {
        Ok(profile) => profile,
        Err(e) => {
            error!(business_id = %business_id, error = %e, "Business store lookup failed");
            return verify_error(
                &state,
                business_id.as_str(),
                VerifyError::Store(e.to_string()),
            );
        }
    };

    let request = VerificationRequest::new(business_id, profile);
    let report = state.aggregator.verify(&request).await;

    if let Err(e) = state.audit.log_verification(&report).await {
        warn!(
            business_id = %report.business_id,
            error = %e,
            "Failed to write verification audit log"
        );
    }

    Json(state.formatter.format(&report)).into_response()
}

/// GET /api/verify/ (no id)
async fn missing_business_id(State(state): State<AppState>) -> Response {
    verify_error(
        &state,
        "",
        VerifyError::InvalidIdentifier("business id must not be empty".to_string()),
    )
}

fn verify_error(state: &AppState, business_id: &str, err: VerifyError) -> Response {
    let (status, code, message) = match &err {
        VerifyError::InvalidIdentifier(msg) => {
            (StatusCode::BAD_REQUEST, "invalid_business_id", msg.clone())
        }
        // Store details stay in the log
        VerifyError::Store(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "verification_unavailable",
            "Verification is temporarily unavailable; the sources below can be checked manually"
                .to_string(),
        ),
    };

    let body = state.formatter.format_error(business_id, code, &message);
    (status, Json(body)).into_response()
}

/// CORS for the public verify route: any origin, `GET`/`OPTIONS`, `Content-Type`
pub fn verify_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(CORS_MAX_AGE)
}

/// Build verification routes
pub fn verify_routes() -> Router<AppState> {
    Router::new()
        .route("/api/verify/:id", get(verify_business))
        .route("/api/verify/", get(missing_business_id))
        .layer(verify_cors())
}
