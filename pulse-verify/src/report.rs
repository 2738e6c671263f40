//! Report formatting
//!
//! Maps a [`VerificationReport`] plus the configured link templates onto the
//! public JSON contract of `GET /api/verify/{id}`.

use crate::config::VerificationConfig;
use crate::score::ScorePolicy;
use crate::types::{BusinessRecord, SourceOutcome, VerificationReport};
use pulse_common::time::to_iso8601;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// Path of the issue-report intake linked from every report
pub const REPORT_ISSUE_PATH: &str = "/report-issue";

/// 200 body of the verify route
#[derive(Debug, Clone, Serialize)]
pub struct VerificationResponse {
    pub business_id: String,
    pub verified: bool,
    pub verification_date: String,
    pub data_quality_score: u8,
    pub sources: Vec<SourceEntry>,
    pub verification_criteria: VerificationCriteria,
    pub how_to_verify_independently: ManualChecks,
    pub report_issue: ReportIssue,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceEntry {
    pub source_name: String,
    /// `verified`, `mismatch`, `not_found` or `error`
    pub status: String,
    pub verification_url: Option<String>,
    pub last_checked: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<SourceDetails>,
}

/// Record fields returned by a source that found the business
#[derive(Debug, Clone, Serialize)]
pub struct SourceDetails {
    pub business_name: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub license_expiry: Option<String>,
}

impl From<&BusinessRecord> for SourceDetails {
    fn from(record: &BusinessRecord) -> Self {
        Self {
            business_name: record.name.clone(),
            address: record.address.clone(),
            status: record.status.clone(),
            license_expiry: record.expiry.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationCriteria {
    pub minimum_score: u8,
    pub required_sources: Vec<String>,
    pub optional_sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualCheck {
    pub url: String,
    pub instructions: String,
}

/// Manual-check links keyed by source id, in source declaration order
///
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualChecks(Vec<(String, ManualCheck)>);

impl ManualChecks {
    pub fn get(&self, source_id: &str) -> Option<&ManualCheck> {
        self.0
            .iter()
            .find(|(id, _)| id == source_id)
            .map(|(_, check)| check)
    }

    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ManualChecks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, check) in &self.0 {
            map.serialize_entry(id, check)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportIssue {
    pub url: String,
    pub method: &'static str,
    pub note: String,
}

/// Error body of the verify route (400 and 500)
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub business_id: String,
    pub verified: bool,
    pub error: String,
    pub message: String,
    pub how_to_verify_manually: ManualChecks,
}

/// Formats reports; built once from the immutable configuration
pub struct ReportFormatter {
    criteria: VerificationCriteria,
    /// `verification_url` templates by source id
    url_templates: HashMap<String, String>,
    manual_checks: ManualChecks,
    report_issue_note: String,
}

impl ReportFormatter {
    pub fn from_config(config: &VerificationConfig) -> Self {
        let policy = ScorePolicy::from_config(config);

        let url_templates = config
            .sources
            .iter()
            .filter_map(|source| {
                source
                    .verification_url
                    .clone()
                    .map(|template| (source.id.clone(), template))
            })
            .collect();

        let manual_checks = ManualChecks(
            config
                .sources
                .iter()
                .map(|source| {
                    (
                        source.id.clone(),
                        ManualCheck {
                            url: source.manual_url.clone(),
                            instructions: source.instructions.clone(),
                        },
                    )
                })
                .collect(),
        );

        Self {
            criteria: VerificationCriteria {
                minimum_score: policy.minimum_score,
                required_sources: policy.required_names(),
                optional_sources: policy.optional_names(),
            },
            url_templates,
            manual_checks,
            report_issue_note: config.report_issue_note.clone(),
        }
    }

    pub fn format(&self, report: &VerificationReport) -> VerificationResponse {
        let encoded_id = encode(report.business_id.as_str());

        let sources = report
            .sources
            .iter()
            .map(|result| {
                let details = match &result.outcome {
                    SourceOutcome::Found { record, .. } => Some(SourceDetails::from(record)),
                    _ => None,
                };
                SourceEntry {
                    source_name: result.source_name.clone(),
                    status: result.outcome.status_label().to_string(),
                    verification_url: self
                        .url_templates
                        .get(&result.source_id)
                        .map(|template| template.replace("{id}", &encoded_id)),
                    last_checked: to_iso8601(&result.checked_at),
                    details,
                }
            })
            .collect();

        VerificationResponse {
            business_id: report.business_id.to_string(),
            verified: report.verified,
            verification_date: to_iso8601(&report.generated_at),
            data_quality_score: report.quality_score,
            sources,
            verification_criteria: self.criteria.clone(),
            how_to_verify_independently: self.manual_checks.clone(),
            report_issue: ReportIssue {
                url: format!("{}?business_id={}", REPORT_ISSUE_PATH, encoded_id),
                method: "POST",
                note: self.report_issue_note.clone(),
            },
        }
    }

    /// Error body; `business_id` is echoed raw since it may have failed validation
    pub fn format_error(&self, business_id: &str, error: &str, message: &str) -> ErrorResponse {
        ErrorResponse {
            business_id: business_id.to_string(),
            verified: false,
            error: error.to_string(),
            message: message.to_string(),
            how_to_verify_manually: self.manual_checks.clone(),
        }
    }
}

fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BusinessId, SourceResult};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    fn report(id: &str, outcomes: Vec<(&str, SourceOutcome)>) -> VerificationReport {
        let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 7).unwrap();
        VerificationReport {
            business_id: BusinessId::parse(id).unwrap(),
            verified: false,
            quality_score: 42,
            sources: outcomes
                .into_iter()
                .map(|(source_id, outcome)| SourceResult {
                    source_id: source_id.to_string(),
                    source_name: source_id.to_uppercase(),
                    checked_at: at,
                    outcome,
                })
                .collect(),
            generated_at: at,
        }
    }

    fn formatter() -> ReportFormatter {
        ReportFormatter::from_config(&VerificationConfig::default())
    }

    #[test]
    fn test_contract_shape() {
        let found = SourceOutcome::Found {
            record: BusinessRecord {
                name: Some("Cafe Noir".to_string()),
                address: Some("Ahad Ha'Am 43".to_string()),
                status: None,
                expiry: Some("2030-01-01".to_string()),
            },
            matches: true,
        };
        let response = formatter().format(&report(
            "12345",
            vec![
                ("municipal_registry", found),
                ("companies_registry", SourceOutcome::NotFound),
                ("google_places", SourceOutcome::error("no key")),
            ],
        ));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["business_id"], "12345");
        assert_eq!(json["verified"], false);
        assert_eq!(json["data_quality_score"], 42);
        assert_eq!(json["verification_date"], "2025-03-09T14:05:07.000Z");

        let sources = json["sources"].as_array().unwrap();
        assert_eq!(sources.len(), 3);
        assert_eq!(sources[0]["status"], "verified");
        assert_eq!(sources[0]["details"]["business_name"], "Cafe Noir");
        assert_eq!(sources[0]["details"]["license_expiry"], "2030-01-01");
        assert_eq!(sources[0]["details"]["status"], Value::Null);
        assert_eq!(sources[1]["status"], "not_found");
        assert!(sources[1].get("details").is_none());
        assert_eq!(sources[2]["status"], "error");
        assert_eq!(sources[2]["verification_url"], Value::Null);

        assert_eq!(json["verification_criteria"]["minimum_score"], 70);
        assert_eq!(
            json["verification_criteria"]["required_sources"],
            serde_json::json!(["Tel Aviv-Yafo Business Licensing"])
        );
        assert!(json["how_to_verify_independently"]["municipal_registry"]["url"].is_string());
        assert_eq!(json["report_issue"]["method"], "POST");
        assert_eq!(json["report_issue"]["url"], "/report-issue?business_id=12345");
    }

    #[test]
    fn test_verification_url_encodes_id() {
        let response = formatter().format(&report(
            "עסק 7&x",
            vec![("municipal_registry", SourceOutcome::NotFound)],
        ));
        let url = response.sources[0].verification_url.as_deref().unwrap();
        assert!(url.ends_with("license=%D7%A2%D7%A1%D7%A7+7%26x"));
        assert_eq!(
            response.report_issue.url,
            "/report-issue?business_id=%D7%A2%D7%A1%D7%A7+7%26x"
        );
    }

    #[test]
    fn test_unknown_source_has_no_link() {
        let response = formatter().format(&report("1", vec![("other", SourceOutcome::NotFound)]));
        assert_eq!(response.sources[0].verification_url, None);
    }

    #[test]
    fn test_error_body() {
        let body = formatter().format_error("  ", "invalid_business_id", "business id must not be empty");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["verified"], false);
        assert_eq!(json["error"], "invalid_business_id");
        let manual = json["how_to_verify_manually"].as_object().unwrap();
        assert_eq!(manual.len(), 3);
        assert!(manual.contains_key("google_places"));
    }

    #[test]
    fn test_manual_checks_follow_source_order() {
        let response = formatter().format(&report("1", Vec::new()));
        let ids: Vec<_> = response.how_to_verify_independently.source_ids().collect();
        assert_eq!(
            ids,
            vec!["municipal_registry", "companies_registry", "google_places"]
        );

        // Object keys keep declaration order, not alphabetical order
        let text = serde_json::to_string(&response.how_to_verify_independently).unwrap();
        let municipal = text.find("\"municipal_registry\"").unwrap();
        let companies = text.find("\"companies_registry\"").unwrap();
        let places = text.find("\"google_places\"").unwrap();
        assert!(municipal < companies && companies < places, "{}", text);
        assert!(response.how_to_verify_independently.get("google_places").is_some());
    }
}
