//! Source adapters against a local stub registry server
//!
//! Each test starts an axum server on an ephemeral port that mimics the
//! ArcGIS, CKAN and find-place APIs, then points an adapter built from
//! configuration at it.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use pulse_common::Business;
use pulse_verify::config::VerificationConfig;
use pulse_verify::sources::{build_adapter, SourceAdapter};
use pulse_verify::types::{BusinessId, SourceOutcome, VerificationRequest};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
struct Hits(Arc<AtomicUsize>);

impl Hits {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

async fn arcgis_query(
    State(hits): State<Hits>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let previous_hits = hits.0.fetch_add(1, Ordering::SeqCst);
    let clause = params.get("where").cloned().unwrap_or_default();

    if clause.contains("'slow-once'") {
        // Only the first request stalls
        if previous_hits == 0 {
            tokio::time::sleep(Duration::from_millis(1500)).await;
        }
        (
            StatusCode::OK,
            Json(json!({ "features": [{ "attributes": { "shem_esek": "Slow Start Bakery" } }] })),
        )
    } else if clause.contains("'5521'") {
        (
            StatusCode::OK,
            Json(json!({
                "features": [{ "attributes": {
                    "shem_esek": "קפה נואר",
                    "ktovet": "אחד העם 43",
                    "tokef_rishyon": "31/12/2099"
                }}]
            })),
        )
    } else if clause.contains("'expired'") {
        (
            StatusCode::OK,
            Json(json!({
                "features": [{ "attributes": { "shem_esek": "קפה נואר", "tokef_rishyon": "2001-01-01" } }]
            })),
        )
    } else if clause.contains("'broken'") {
        (
            StatusCode::OK,
            Json(json!({ "error": { "code": 400, "message": "Unable to complete operation." } })),
        )
    } else if clause.contains("'crash'") {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": "boom" })))
    } else if clause.contains("'gone'") {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "no such layer" })))
    } else {
        (StatusCode::OK, Json(json!({ "features": [] })))
    }
}

async fn ckan_search(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    let filters = params.get("filters").cloned().unwrap_or_default();
    let records = if filters.contains("514000001") {
        json!([{ "מספר חברה": 514000001, "שם חברה": "קפה נואר בע\"מ", "סטטוס חברה": "פעילה" }])
    } else if filters.contains("514000002") {
        json!([{ "מספר חברה": 514000002, "שם חברה": "קפה נואר בע\"מ", "סטטוס חברה": "מחוקה" }])
    } else {
        json!([])
    };
    Json(json!({ "success": true, "result": { "records": records } }))
}

async fn find_place(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    if params.get("key").map(String::as_str) != Some("test-key") {
        return Json(json!({ "status": "REQUEST_DENIED", "error_message": "The provided API key is invalid." }));
    }
    let input = params.get("input").cloned().unwrap_or_default();
    if input.contains("Cafe Noir") {
        Json(json!({
            "status": "OK",
            "candidates": [{
                "name": "Cafe Noir",
                "formatted_address": "Ahad Ha'Am St 43, Tel Aviv-Yafo",
                "business_status": "OPERATIONAL"
            }]
        }))
    } else {
        Json(json!({ "status": "ZERO_RESULTS", "candidates": [] }))
    }
}

/// Start the stub server; returns its base URL and the ArcGIS hit counter
async fn spawn_stub() -> (String, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/layer/query", get(arcgis_query))
        .route("/api/3/action/datastore_search", get(ckan_search))
        .route("/place/findplacefromtext/json", get(find_place))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), hits)
}

fn config_for(base: &str) -> VerificationConfig {
    let mut config = VerificationConfig {
        source_timeout_secs: 5,
        max_attempts: 2,
        ..Default::default()
    };
    config.sources[0].base_url = format!("{}/layer", base);
    config.sources[1].base_url = base.to_string();
    config.sources[2].base_url = format!("{}/place", base);
    config.sources[2].api_key = Some("test-key".to_string());
    for source in &mut config.sources {
        source.requests_per_second = None;
    }
    config
}

fn adapter(config: &VerificationConfig, index: usize) -> Arc<dyn SourceAdapter> {
    build_adapter(&config.sources[index], config).unwrap()
}

fn request(id: &str, profile: Option<Business>) -> VerificationRequest {
    VerificationRequest::new(BusinessId::parse(id).unwrap(), profile)
}

fn cafe_noir() -> Business {
    let mut business = Business::new("cafe-noir", "קפה נואר");
    business.license_number = Some("5521".to_string());
    business.company_number = Some("514000001".to_string());
    business
}

// =============================================================================
// Municipal registry (ArcGIS)
// =============================================================================

#[tokio::test]
async fn test_municipal_found_and_matching() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 0)
        .lookup(&request("cafe-noir", Some(cafe_noir())))
        .await;

    match outcome {
        SourceOutcome::Found { record, matches } => {
            assert!(matches);
            assert_eq!(record.address.as_deref(), Some("אחד העם 43"));
        }
        other => panic!("expected found, got {:?}", other),
    }
}

#[tokio::test]
async fn test_municipal_expired_license_is_mismatch() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 0).lookup(&request("expired", None)).await;
    assert_eq!(outcome.status_label(), "mismatch");
}

#[tokio::test]
async fn test_municipal_not_found() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 0).lookup(&request("unknown-id-999", None)).await;
    assert_eq!(outcome, SourceOutcome::NotFound);
}

#[tokio::test]
async fn test_municipal_error_payload_is_error() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    match adapter(&config, 0).lookup(&request("broken", None)).await {
        SourceOutcome::Error { reason } => assert!(reason.contains("Unable to complete")),
        other => panic!("expected error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_retried_then_reported() {
    let (base, hits) = spawn_stub().await;
    let config = config_for(&base);

    match adapter(&config, 0).lookup(&request("crash", None)).await {
        SourceOutcome::Error { reason } => assert!(reason.contains("500")),
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn test_timed_out_attempt_is_retried_within_source_budget() {
    let (base, hits) = spawn_stub().await;
    let mut config = config_for(&base);
    // Two attempts of one second each
    config.source_timeout_secs = 2;

    let outcome = adapter(&config, 0).lookup(&request("slow-once", None)).await;
    assert!(outcome.is_match(), "got {:?}", outcome);
    assert_eq!(hits.count(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (base, hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 0).lookup(&request("gone", None)).await;
    assert_eq!(outcome.status_label(), "error");
    assert_eq!(hits.count(), 1);
}

#[tokio::test]
async fn test_unreachable_source_is_error() {
    // Nothing listens on the discard port
    let config = config_for("http://127.0.0.1:9");

    let outcome = adapter(&config, 0).lookup(&request("5521", None)).await;
    assert_eq!(outcome.status_label(), "error");
}

// =============================================================================
// Companies registrar (CKAN)
// =============================================================================

#[tokio::test]
async fn test_companies_found_by_company_number() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 1)
        .lookup(&request("cafe-noir", Some(cafe_noir())))
        .await;
    assert!(outcome.is_match(), "got {:?}", outcome);
}

#[tokio::test]
async fn test_companies_deleted_company_is_mismatch() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let mut business = cafe_noir();
    business.company_number = Some("514000002".to_string());
    let outcome = adapter(&config, 1)
        .lookup(&request("cafe-noir", Some(business)))
        .await;
    assert_eq!(outcome.status_label(), "mismatch");
}

#[tokio::test]
async fn test_companies_numeric_id_not_found() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 1).lookup(&request("599999999", None)).await;
    assert_eq!(outcome, SourceOutcome::NotFound);
}

// =============================================================================
// Places lookup
// =============================================================================

#[tokio::test]
async fn test_places_found() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let mut business = Business::new("cafe-noir", "Cafe Noir");
    business.address = Some("Ahad Ha'Am 43".to_string());
    let outcome = adapter(&config, 2)
        .lookup(&request("cafe-noir", Some(business)))
        .await;
    assert!(outcome.is_match(), "got {:?}", outcome);
}

#[tokio::test]
async fn test_places_zero_results_is_not_found() {
    let (base, _hits) = spawn_stub().await;
    let config = config_for(&base);

    let outcome = adapter(&config, 2)
        .lookup(&request("b-2", Some(Business::new("b-2", "Unlisted Kiosk"))))
        .await;
    assert_eq!(outcome, SourceOutcome::NotFound);
}

#[tokio::test]
async fn test_places_rejected_key_is_error() {
    let (base, _hits) = spawn_stub().await;
    let mut config = config_for(&base);
    config.sources[2].api_key = Some("wrong-key".to_string());

    match adapter(&config, 2)
        .lookup(&request("cafe-noir", Some(Business::new("cafe-noir", "Cafe Noir"))))
        .await
    {
        SourceOutcome::Error { reason } => {
            assert!(reason.contains("REQUEST_DENIED"));
            // Keys never leak into reasons
            assert!(!reason.contains("wrong-key"));
        }
        other => panic!("expected error, got {:?}", other),
    }
}
