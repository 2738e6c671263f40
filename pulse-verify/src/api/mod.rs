//! HTTP API handlers for pulse-verify

pub mod businesses;
pub mod health;
pub mod report_issue;
pub mod verify;

pub use businesses::business_routes;
pub use health::health_routes;
pub use report_issue::report_issue_routes;
pub use verify::verify_routes;
