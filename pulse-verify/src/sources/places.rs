//! Map places lookup (find place from text)
//!
//! `GET {base_url}/findplacefromtext/json?input=<name address>&inputtype=textquery&fields=..&key=..`
//!
//! Needs an API key and the directory name of the business; without either
//! the source reports an error rather than a miss.

use super::matching::names_match;
use super::{FieldAliases, SourceAdapter, SourceHttp};
use crate::config::SourceConfig;
use crate::types::{AdapterError, BusinessRecord, VerificationRequest};
use async_trait::async_trait;
use serde_json::Value;

const RESPONSE_FIELDS: &str = "name,formatted_address,business_status";

pub struct PlacesAdapter {
    id: String,
    name: String,
    base_url: String,
    api_key: Option<String>,
    aliases: FieldAliases,
    http: SourceHttp,
}

impl PlacesAdapter {
    pub fn new(config: &SourceConfig, http: SourceHttp) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            aliases: FieldAliases::for_source(config),
            http,
        }
    }
}

#[async_trait]
impl SourceAdapter for PlacesAdapter {
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
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AdapterError::NotConfigured("API key is not set".to_string()))?;

        let profile = request
            .profile
            .as_ref()
            .filter(|p| !p.name.trim().is_empty())
            .ok_or_else(|| {
                AdapterError::NotConfigured("business name unknown, nothing to search".to_string())
            })?;

        let url = format!("{}/findplacefromtext/json", self.base_url);
        let query = [
            ("input", profile.search_text()),
            ("inputtype", "textquery".to_string()),
            ("fields", RESPONSE_FIELDS.to_string()),
            ("key", api_key.to_string()),
        ];

        let body = self.http.get_json(&url, &query).await?;
        parse_response(&body, &self.aliases, Some(profile.name.as_str()))
    }
}

/// Interpret a find-place response
pub fn parse_response(
    body: &Value,
    aliases: &FieldAliases,
    known_name: Option<&str>,
) -> Result<Option<BusinessRecord>, AdapterError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .ok_or_else(|| AdapterError::Parse("response has no status".to_string()))?;

    match status {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        other => {
            let detail = body
                .get("error_message")
                .and_then(Value::as_str)
                .map(|m| format!("{}: {}", other, m))
                .unwrap_or_else(|| other.to_string());
            return Err(AdapterError::Upstream(detail));
        }
    }

    let candidates: Vec<BusinessRecord> = body
        .get("candidates")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::Parse("response has no candidates array".to_string()))?
        .iter()
        .filter_map(Value::as_object)
        .map(|fields| aliases.normalize(fields))
        .collect();

    let preferred = known_name.and_then(|known| {
        candidates
            .iter()
            .position(|c| c.name.as_deref().is_some_and(|n| names_match(known, n)))
    });

    Ok(candidates.into_iter().nth(preferred.unwrap_or(0)))
}
