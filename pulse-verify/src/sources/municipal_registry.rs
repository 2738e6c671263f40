//! Municipal business licensing registry
//!
//! Queries the municipality's ArcGIS feature layer of licensed businesses by
//! license number:
//!
//! `GET {base_url}/query?where={lookup_field}='{license}'&outFields=*&f=json`
//!
//! Matching rows arrive as `features[].attributes`. ArcGIS reports query
//! failures with HTTP 200 and an `error` object, which becomes an
//! `AdapterError::Upstream`.

use super::{FieldAliases, SourceAdapter, SourceHttp};
use crate::config::SourceConfig;
use crate::types::{AdapterError, BusinessRecord, VerificationRequest};
use async_trait::async_trait;
use serde_json::Value;

/// License-number column when the config does not name one
const DEFAULT_LOOKUP_FIELD: &str = "ms_rishyon";

pub struct MunicipalRegistryAdapter {
    id: String,
    name: String,
    base_url: String,
    lookup_field: String,
    aliases: FieldAliases,
    http: SourceHttp,
}

impl MunicipalRegistryAdapter {
    pub fn new(config: &SourceConfig, http: SourceHttp) -> Self {
        Self {
            id: config.id.clone(),
            name: config.name.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            lookup_field: config
                .lookup_field
                .clone()
                .unwrap_or_else(|| DEFAULT_LOOKUP_FIELD.to_string()),
            aliases: FieldAliases::for_source(config),
            http,
        }
    }

    /// SQL-style `where` clause with the literal quoted for ArcGIS
    fn where_clause(&self, license: &str) -> String {
        format!("{} = '{}'", self.lookup_field, license.replace('\'', "''"))
    }
}

#[async_trait]
impl SourceAdapter for MunicipalRegistryAdapter {
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
        let url = format!("{}/query", self.base_url);
        let query = [
            ("where", self.where_clause(request.license_number())),
            ("outFields", "*".to_string()),
            ("returnGeometry", "false".to_string()),
            ("f", "json".to_string()),
        ];

        let body = self.http.get_json(&url, &query).await?;
        parse_response(&body, &self.aliases)
    }
}

/// Extract the first feature's attributes from an ArcGIS query response
pub fn parse_response(
    body: &Value,
    aliases: &FieldAliases,
) -> Result<Option<BusinessRecord>, AdapterError> {
    if let Some(error) = body.get("error") {
        let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AdapterError::Upstream(format!("ArcGIS error {}: {}", code, message)));
    }

    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| AdapterError::Parse("response has no features array".to_string()))?;

    let Some(first) = features.first() else {
        return Ok(None);
    };

    let attributes = first
        .get("attributes")
        .and_then(Value::as_object)
        .ok_or_else(|| AdapterError::Parse("feature has no attributes object".to_string()))?;

    Ok(Some(aliases.normalize(attributes)))
}
