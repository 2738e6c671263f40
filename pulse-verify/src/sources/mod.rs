//! Source adapters
//!
//! Each adapter wraps one external registry behind [`SourceAdapter`] and turns
//! a [`VerificationRequest`] into exactly one [`SourceOutcome`].
//!
//! # Adapters
//! 1. **municipal_registry** - municipal business licensing layer (ArcGIS query)
//! 2. **companies_registry** - companies registrar (CKAN `datastore_search`)
//! 3. **places** - map places lookup (find-place-from-text)
//!
//! # Error isolation
//! Transport, status and parse failures are converted to
//! `SourceOutcome::Error` inside [`SourceAdapter::lookup`]; they never reach
//! the aggregator as `Err`.
//!
//! # Field dialects
//! Upstream sources label the same field differently (Hebrew and English
//! column names). Every adapter owns a [`FieldAliases`] table and normalizes
//! records by checking aliases in priority order.

pub mod companies_registry;
pub mod http;
pub mod matching;
pub mod municipal_registry;
pub mod places;

use crate::config::{FieldAliasConfig, SourceConfig, SourceKind, VerificationConfig};
use crate::types::{AdapterError, BusinessRecord, SourceOutcome, VerificationRequest};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub use companies_registry::CompaniesRegistryAdapter;
pub use http::SourceHttp;
pub use municipal_registry::MunicipalRegistryAdapter;
pub use places::PlacesAdapter;

/// Uniform interface over one external data source
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable source id (matches `SourceConfig::id`)
    fn id(&self) -> &str;

    /// Display name used as `source_name` in reports
    fn name(&self) -> &str;

    /// Query the source and normalize the best record
    ///
    /// # Returns
    /// * `Ok(Some(record))` - the source has a record
    /// * `Ok(None)` - the source has no record
    /// * `Err(_)` - the source could not be queried
    async fn fetch(
        &self,
        request: &VerificationRequest,
    ) -> Result<Option<BusinessRecord>, AdapterError>;

    /// Produce the outcome for this source; never fails
    async fn lookup(&self, request: &VerificationRequest) -> SourceOutcome {
        match self.fetch(request).await {
            Ok(Some(record)) => {
                let matches =
                    matching::record_matches(&record, request, chrono::Utc::now().date_naive());
                debug!(
                    source = self.id(),
                    business_id = %request.business_id,
                    matches,
                    "Source record found"
                );
                SourceOutcome::Found { record, matches }
            }
            Ok(None) => {
                debug!(
                    source = self.id(),
                    business_id = %request.business_id,
                    "Source has no record"
                );
                SourceOutcome::NotFound
            }
            Err(e) => {
                warn!(
                    source = self.id(),
                    business_id = %request.business_id,
                    error = %e,
                    "Source lookup failed (isolated)"
                );
                SourceOutcome::error(e.to_string())
            }
        }
    }
}

// ============================================================================
// Field alias tables
// ============================================================================

const MUNICIPAL_NAME: &[&str] = &["shem_esek", "שם_עסק", "שם עסק", "business_name", "name"];
const MUNICIPAL_ADDRESS: &[&str] = &["ktovet", "כתובת", "full_address", "address"];
const MUNICIPAL_STATUS: &[&str] = &["status_rishyon", "מצב_רישיון", "סטטוס", "status"];
const MUNICIPAL_EXPIRY: &[&str] = &[
    "tokef_rishyon",
    "תוקף_רישיון",
    "תאריך_תוקף",
    "license_expiry",
    "expiry_date",
];

const COMPANIES_NAME: &[&str] = &["שם חברה", "שם החברה", "company_name", "name"];
const COMPANIES_ADDRESS: &[&str] = &["כתובת", "address", "שם רחוב", "שם עיר"];
const COMPANIES_STATUS: &[&str] = &["סטטוס חברה", "company_status", "status"];
const COMPANIES_EXPIRY: &[&str] = &["תאריך פקיעה", "expiry_date"];

const PLACES_NAME: &[&str] = &["name"];
const PLACES_ADDRESS: &[&str] = &["formatted_address", "vicinity"];
const PLACES_STATUS: &[&str] = &["business_status"];
const PLACES_EXPIRY: &[&str] = &[];

/// Alias-priority table mapping a source's field dialect onto [`BusinessRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
    pub name: Vec<String>,
    pub address: Vec<String>,
    pub status: Vec<String>,
    pub expiry: Vec<String>,
}

fn owned(aliases: &[&str]) -> Vec<String> {
    aliases.iter().map(|a| a.to_string()).collect()
}

impl FieldAliases {
    /// Built-in table for a source kind
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::MunicipalRegistry => Self {
                name: owned(MUNICIPAL_NAME),
                address: owned(MUNICIPAL_ADDRESS),
                status: owned(MUNICIPAL_STATUS),
                expiry: owned(MUNICIPAL_EXPIRY),
            },
            SourceKind::CompaniesRegistry => Self {
                name: owned(COMPANIES_NAME),
                address: owned(COMPANIES_ADDRESS),
                status: owned(COMPANIES_STATUS),
                expiry: owned(COMPANIES_EXPIRY),
            },
            SourceKind::Places => Self {
                name: owned(PLACES_NAME),
                address: owned(PLACES_ADDRESS),
                status: owned(PLACES_STATUS),
                expiry: owned(PLACES_EXPIRY),
            },
        }
    }

    /// Table for a configured source: per-field overrides, built-ins elsewhere
    pub fn for_source(config: &SourceConfig) -> Self {
        let mut aliases = Self::for_kind(config.kind);
        if let Some(FieldAliasConfig {
            name,
            address,
            status,
            expiry,
        }) = &config.aliases
        {
            if !name.is_empty() {
                aliases.name = name.clone();
            }
            if !address.is_empty() {
                aliases.address = address.clone();
            }
            if !status.is_empty() {
                aliases.status = status.clone();
            }
            if !expiry.is_empty() {
                aliases.expiry = expiry.clone();
            }
        }
        aliases
    }

    /// Normalize one raw record
    pub fn normalize(&self, fields: &Map<String, Value>) -> BusinessRecord {
        BusinessRecord {
            name: pick(fields, &self.name),
            address: pick(fields, &self.address),
            status: pick(fields, &self.status),
            expiry: pick(fields, &self.expiry),
        }
    }
}

/// First alias holding a non-empty string or a number
fn pick(fields: &Map<String, Value>, aliases: &[String]) -> Option<String> {
    aliases.iter().find_map(|alias| match fields.get(alias)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Build the adapter for one configured source
pub fn build_adapter(
    source: &SourceConfig,
    verification: &VerificationConfig,
) -> Result<Arc<dyn SourceAdapter>, AdapterError> {
    let http = SourceHttp::new(
        &source.id,
        verification.attempt_timeout(),
        verification.max_attempts,
        source.requests_per_second,
    )?;

    let adapter: Arc<dyn SourceAdapter> = match source.kind {
        SourceKind::MunicipalRegistry => Arc::new(MunicipalRegistryAdapter::new(source, http)),
        SourceKind::CompaniesRegistry => Arc::new(CompaniesRegistryAdapter::new(source, http)),
        SourceKind::Places => Arc::new(PlacesAdapter::new(source, http)),
    };

    Ok(adapter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_sources;
    use crate::types::BusinessId;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_normalize_hebrew_municipal_fields() {
        let aliases = FieldAliases::for_kind(SourceKind::MunicipalRegistry);
        let record = aliases.normalize(&as_map(json!({
            "שם_עסק": "קפה נואר",
            "כתובת": "אחד העם 43",
            "מצב_רישיון": "בתוקף",
            "תוקף_רישיון": "31/12/2030"
        })));
        assert_eq!(record.name.as_deref(), Some("קפה נואר"));
        assert_eq!(record.address.as_deref(), Some("אחד העם 43"));
        assert_eq!(record.status.as_deref(), Some("בתוקף"));
        assert_eq!(record.expiry.as_deref(), Some("31/12/2030"));
    }

    #[test]
    fn test_alias_priority_order() {
        let aliases = FieldAliases::for_kind(SourceKind::MunicipalRegistry);
        let record = aliases.normalize(&as_map(json!({
            "name": "English Name",
            "shem_esek": "Primary Name"
        })));
        assert_eq!(record.name.as_deref(), Some("Primary Name"));
    }

    #[test]
    fn test_empty_values_fall_through_to_next_alias() {
        let aliases = FieldAliases::for_kind(SourceKind::MunicipalRegistry);
        let record = aliases.normalize(&as_map(json!({
            "shem_esek": "   ",
            "שם_עסק": null,
            "business_name": "Fallback Ltd"
        })));
        assert_eq!(record.name.as_deref(), Some("Fallback Ltd"));
    }

    #[test]
    fn test_numeric_values_are_stringified() {
        let aliases = FieldAliases::for_kind(SourceKind::MunicipalRegistry);
        let record = aliases.normalize(&as_map(json!({ "tokef_rishyon": 1924992000000u64 })));
        assert_eq!(record.expiry.as_deref(), Some("1924992000000"));
    }

    #[test]
    fn test_config_override_replaces_only_given_fields() {
        let mut source = default_sources().remove(0);
        source.aliases = Some(FieldAliasConfig {
            name: vec!["trade_name".to_string()],
            ..Default::default()
        });
        let aliases = FieldAliases::for_source(&source);
        assert_eq!(aliases.name, vec!["trade_name".to_string()]);
        assert_eq!(aliases.address, owned(MUNICIPAL_ADDRESS));
    }

    #[test]
    fn test_build_adapter_uses_config_identity() {
        let verification = VerificationConfig::default();
        for source in &verification.sources {
            let adapter = build_adapter(source, &verification).unwrap();
            assert_eq!(adapter.id(), source.id);
            assert_eq!(adapter.name(), source.name);
        }
    }

    struct FixedAdapter(Result<Option<BusinessRecord>, &'static str>);

    #[async_trait]
    impl SourceAdapter for FixedAdapter {
        fn id(&self) -> &str {
            "fixed"
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        async fn fetch(
            &self,
            _request: &VerificationRequest,
        ) -> Result<Option<BusinessRecord>, AdapterError> {
            self.0
                .clone()
                .map_err(|e| AdapterError::Transport(e.to_string()))
        }
    }

    fn request() -> VerificationRequest {
        VerificationRequest::new(BusinessId::parse("5521").unwrap(), None)
    }

    #[tokio::test]
    async fn test_lookup_converts_errors_to_outcomes() {
        let outcome = FixedAdapter(Err("connection refused")).lookup(&request()).await;
        match outcome {
            SourceOutcome::Error { reason } => assert!(reason.contains("connection refused")),
            other => panic!("expected error outcome, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let outcome = FixedAdapter(Ok(None)).lookup(&request()).await;
        assert_eq!(outcome, SourceOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_lookup_found_without_profile_matches_by_identifier() {
        let record = BusinessRecord {
            name: Some("Anything".to_string()),
            ..Default::default()
        };
        let outcome = FixedAdapter(Ok(Some(record))).lookup(&request()).await;
        assert!(outcome.is_match());
    }
}
