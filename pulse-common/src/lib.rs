//! # TLV Business Pulse Common Library
//!
//! Shared code for the Pulse services including:
//! - Common error type
//! - Configuration file resolution and logging setup
//! - Database bootstrap (SQLite schema)
//! - Business directory model
//! - Timestamp helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
pub use models::Business;
