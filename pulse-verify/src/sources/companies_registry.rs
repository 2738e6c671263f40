//! Companies registrar on the national open-data portal (CKAN)
//!
//! `GET {base_url}/api/3/action/datastore_search?resource_id=..&filters={..}`
//!
//! Search key, in order:
//! 1. company number from the directory entry (exact `filters` match)
//! 2. the business id itself when it is all digits (registrar numbers are numeric)
//! 3. the directory name as free text (`q`)

use super::matching::names_match;
use super::{FieldAliases, SourceAdapter, SourceHttp};
use crate::config::SourceConfig;
use crate::types::{AdapterError, BusinessRecord, VerificationRequest};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Company-number column when the config does not name one
const DEFAULT_LOOKUP_FIELD: &str = "מספר חברה";

/// Rows fetched for a free-text search
const SEARCH_LIMIT: &str = "5";

pub struct CompaniesRegistryAdapter {
    id: String,
    name: String,
    base_url: String,
    resource_id: Option<String>,
    lookup_field: String,
    aliases: FieldAliases,
    http: SourceHttp,
}

/// How a request is looked up in the registrar
#[derive(Debug, Clone, PartialEq, Eq)]
enum SearchKey {
    CompanyNumber(String),
    Text(String),
}

impl CompaniesRegistryAdapter {
    pub fn new(config: &SourceConfig, http: SourceHttp) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            resource_id: config.resource_id.clone(),
            lookup_field: config
                .lookup_field
                .clone()
                .unwrap_or_else(|| DEFAULT_LOOKUP_FIELD.to_string()),
            aliases: FieldAliases::for_source(config),
            http,
        }
    }

    fn search_key(request: &VerificationRequest) -> Option<SearchKey> {
        let company_number = request
            .profile
            .as_ref()
            .and_then(|p| p.company_number.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(number) = company_number {
            return Some(SearchKey::CompanyNumber(number.to_string()));
        }

        let id = request.business_id.as_str();
        if id.chars().all(|c| c.is_ascii_digit()) {
            return Some(SearchKey::CompanyNumber(id.to_string()));
        }

        request
            .known_name()
            .map(|name| SearchKey::Text(name.to_string()))
    }
}

#[async_trait]
impl SourceAdapter for CompaniesRegistryAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        request: &VerificationRequest,
    ) -> Result<Option<BusinessRecord>, AdapterError> {
        let resource_id = self
            .resource_id
            .as_deref()
            .ok_or_else(|| AdapterError::NotConfigured("resource_id is not set".to_string()))?;

        let key = Self::search_key(request).ok_or_else(|| {
            AdapterError::NotConfigured("no company number or business name to search".to_string())
        })?;

        let mut query = vec![
            ("resource_id", resource_id.to_string()),
            ("limit", SEARCH_LIMIT.to_string()),
        ];
        match &key {
            SearchKey::CompanyNumber(number) => {
                let mut filters = Map::new();
                filters.insert(self.lookup_field.clone(), Value::String(number.clone()));
                query.push(("filters", Value::Object(filters).to_string()));
            }
            SearchKey::Text(text) => query.push(("q", text.clone())),
        }

        let url = format!("{}/api/3/action/datastore_search", self.base_url);
        let body = self.http.get_json(&url, &query).await?;
        parse_response(&body, &self.aliases, request.known_name())
    }
}

/// Pick the best record from a `datastore_search` response
///
/// With a known name, the first record whose name matches wins; otherwise
/// the first record.
pub fn parse_response(
    body: &Value,
    aliases: &FieldAliases,
    known_name: Option<&str>,
) -> Result<Option<BusinessRecord>, AdapterError> {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => {}
        Some(false) => {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("request was not successful");
            return Err(AdapterError::Upstream(message.to_string()));
        }
        None => return Err(AdapterError::Parse("response has no success flag".to_string())),
    }

    let records = body
        .pointer("/result/records")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::Parse("response has no result.records array".to_string()))?;

    let normalized: Vec<BusinessRecord> = records
        .iter()
        .filter_map(Value::as_object)
        .map(|fields| aliases.normalize(fields))
        .collect();

    let preferred = known_name.and_then(|known| {
        normalized
            .iter()
            .position(|r| r.name.as_deref().is_some_and(|n| names_match(known, n)))
    });

    Ok(normalized.into_iter().nth(preferred.unwrap_or(0)))
}
