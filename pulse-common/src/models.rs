//! Business directory model shared by the Pulse services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business listed in the directory
///
/// The verification service reads `name`, `address`, `license_number` and
/// `company_number` to query registries and to decide whether a registry
/// record refers to the same business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Business {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    /// Municipal business license number
    pub license_number: Option<String>,
    /// Companies registrar number (ח.פ.)
    pub company_number: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Business {
    /// Create a business with only the required fields set
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            address: None,
            city: None,
            category: None,
            license_number: None,
            company_number: None,
            phone: None,
            website: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name and address joined for free-text place searches
    pub fn search_text(&self) -> String {
        match (&self.address, &self.city) {
            (Some(address), Some(city)) => format!("{} {} {}", self.name, address, city),
            (Some(address), None) => format!("{} {}", self.name, address),
            (None, Some(city)) => format!("{} {}", self.name, city),
            (None, None) => self.name.clone(),
        }
    }
}
