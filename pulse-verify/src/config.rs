//! Configuration for pulse-verify
//!
//! Resolution priority: command line → environment (`PULSE_*`) → TOML file →
//! compiled defaults. The resolved [`ServiceConfig`] is immutable once the
//! service starts; adapters receive their [`SourceConfig`] explicitly and never
//! read the environment themselves.

use pulse_common::config::{default_data_dir, LoggingConfig};
use pulse_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Default TOML file name under the config directory
pub const CONFIG_FILE_NAME: &str = "pulse-verify.toml";

/// Environment variable naming an explicit TOML file
pub const CONFIG_ENV_VAR: &str = "PULSE_CONFIG";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5740;

/// Top-level service configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub verification: VerificationConfig,
}

/// `[server]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `[database]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file; defaults to `<data dir>/tlv-pulse/pulse.db`
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| default_data_dir().join("pulse.db"))
    }
}

/// `[verification]` table: score policy plus the ordered source list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Score at or above which a business can be verified (0-100)
    pub minimum_score: u8,
    /// Upper bound on one source call including retries; each attempt gets an equal share
    pub source_timeout_secs: u64,
    /// Attempts per source call (1 = no retry); transport errors, 5xx and 429 are retried
    pub max_attempts: u32,
    /// Text of `report_issue.note` in verification reports
    pub report_issue_note: String,
    /// Sources in declaration order; report order follows this list
    pub sources: Vec<SourceConfig>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            minimum_score: 70,
            source_timeout_secs: 10,
            max_attempts: 2,
            report_issue_note: "Found outdated or wrong registry data? Report it and we will re-check the sources.".to_string(),
            sources: default_sources(),
        }
    }
}

impl VerificationConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs.max(1))
    }

    /// Timeout of a single HTTP attempt: the source budget split across attempts
    pub fn attempt_timeout(&self) -> Duration {
        self.source_timeout() / self.max_attempts.max(1)
    }

    /// Reject configurations that cannot produce meaningful reports
    pub fn validate(&self) -> Result<()> {
        if self.minimum_score > 100 {
            return Err(Error::Config(format!(
                "minimum_score must be 0-100, got {}",
                self.minimum_score
            )));
        }

        if self.max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(Error::Config(format!(
                    "source '{}' has an empty id",
                    source.name
                )));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(Error::Config(format!("duplicate source id '{}'", source.id)));
            }
            if source.mismatch_weight > source.weight {
                warn!(
                    source = %source.id,
                    weight = source.weight,
                    mismatch_weight = source.mismatch_weight,
                    "mismatch_weight exceeds weight, it will be capped"
                );
            }
        }

        let total: u64 = self.sources.iter().map(|s| u64::from(s.weight)).sum();
        if total == 0 {
            return Err(Error::Config(
                "at least one source with a non-zero weight is required".to_string(),
            ));
        }

        Ok(())
    }
}

/// Which wire protocol a source speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// ArcGIS feature-service query (municipal business licensing layer)
    MunicipalRegistry,
    /// CKAN `datastore_search` (companies registrar on the open-data portal)
    CompaniesRegistry,
    /// Find-place-from-text lookup
    Places,
}

/// Field-name aliases, highest priority first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldAliasConfig {
    pub name: Vec<String>,
    pub address: Vec<String>,
    pub status: Vec<String>,
    pub expiry: Vec<String>,
}

/// One `[[verification.sources]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable key used in `how_to_verify_independently`
    pub id: String,
    /// Display name used as `source_name`
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub required: bool,
    /// Points earned by a matching record
    pub weight: u32,
    /// Points earned by a record that exists but does not match
    #[serde(default)]
    pub mismatch_weight: u32,
    pub base_url: String,
    /// CKAN resource id
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Field queried by identifier (ArcGIS `where` column / CKAN filter key)
    #[serde(default)]
    pub lookup_field: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub requests_per_second: Option<u32>,
    /// Public lookup link; `{id}` is replaced with the URL-encoded business id
    #[serde(default)]
    pub verification_url: Option<String>,
    /// Landing page for manual checks
    pub manual_url: String,
    pub instructions: String,
    /// Overrides the built-in alias table for this source kind
    #[serde(default)]
    pub aliases: Option<FieldAliasConfig>,
}

/// Built-in source list: municipal licensing (required), companies registrar, places
pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: "municipal_registry".to_string(),
            name: "Tel Aviv-Yafo Business Licensing".to_string(),
            kind: SourceKind::MunicipalRegistry,
            required: true,
            weight: 50,
            mismatch_weight: 10,
            base_url: "https://gisn.tel-aviv.gov.il/arcgis/rest/services/IView2/MapServer/964".to_string(),
            resource_id: None,
            lookup_field: Some("ms_rishyon".to_string()),
            api_key: None,
            requests_per_second: Some(5),
            verification_url: Some("https://www.tel-aviv.gov.il/Business/Pages/BusinessLicensing.aspx?license={id}".to_string()),
            manual_url: "https://www.tel-aviv.gov.il/Business/Pages/BusinessLicensing.aspx".to_string(),
            instructions: "Open the municipal business licensing search and enter the license number. The license must be active and the business name must match.".to_string(),
            aliases: None,
        },
        SourceConfig {
            id: "companies_registry".to_string(),
            name: "Israeli Companies Registrar".to_string(),
            kind: SourceKind::CompaniesRegistry,
            required: false,
            weight: 30,
            mismatch_weight: 5,
            base_url: "https://data.gov.il".to_string(),
            resource_id: Some("f004176c-b85f-4542-8901-7b3176f9a054".to_string()),
            lookup_field: Some("מספר חברה".to_string()),
            api_key: None,
            requests_per_second: Some(5),
            verification_url: Some("https://data.gov.il/dataset/ica_companies?q={id}".to_string()),
            manual_url: "https://ica.justice.gov.il/GenericCorporarionInfo/SearchCorporation?unit=8".to_string(),
            instructions: "Search the Companies Registrar by company number or name and check that the company status is active.".to_string(),
            aliases: None,
        },
        SourceConfig {
            id: "google_places".to_string(),
            name: "Google Places".to_string(),
            kind: SourceKind::Places,
            required: false,
            weight: 20,
            mismatch_weight: 5,
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
            resource_id: None,
            lookup_field: None,
            api_key: None,
            requests_per_second: Some(10),
            verification_url: None,
            manual_url: "https://www.google.com/maps".to_string(),
            instructions: "Search the business name and address on Google Maps and confirm the listing is not marked as permanently closed.".to_string(),
            aliases: None,
        },
    ]
}

impl ServiceConfig {
    /// Apply `PULSE_*` environment overrides on top of TOML values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(host) = env_value("PULSE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_value("PULSE_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("PULSE_PORT '{}': {}", port, e)))?;
        }
        if let Some(path) = env_value("PULSE_DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(level) = env_value("PULSE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(score) = env_value("PULSE_MINIMUM_SCORE") {
            self.verification.minimum_score = score
                .parse()
                .map_err(|e| Error::Config(format!("PULSE_MINIMUM_SCORE '{}': {}", score, e)))?;
        }
        if let Some(key) = env_value("PULSE_PLACES_API_KEY") {
            for source in self
                .verification
                .sources
                .iter_mut()
                .filter(|s| s.kind == SourceKind::Places)
            {
                source.api_key = Some(key.clone());
            }
            info!("Places API key loaded from environment variable");
        }
        Ok(())
    }

    /// Log configuration problems that degrade but do not block verification
    pub fn log_warnings(&self) {
        for source in &self.verification.sources {
            let missing_key = source
                .api_key
                .as_deref()
                .map(|k| k.trim().is_empty())
                .unwrap_or(true);
            if source.kind == SourceKind::Places && missing_key {
                warn!(
                    source = %source.id,
                    "No API key configured; this source will report errors. Set PULSE_PLACES_API_KEY or api_key in the TOML file"
                );
            }
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
