//! Deciding whether a registry record corroborates a business
//!
//! A record matches when:
//! - its status is not an inactive marker
//! - its expiry date (when parseable) is not in the past
//! - its name is similar to the directory name (when both are known)

use crate::types::{BusinessRecord, VerificationRequest};
use chrono::{DateTime, NaiveDate};

/// Jaro-Winkler similarity at or above which two names are the same business
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Containment only counts when the shorter name has at least this many characters
const MIN_CONTAINMENT_LEN: usize = 4;

/// Legal-form tokens ignored when comparing names
const LEGAL_SUFFIXES: &[&str] = &["בעמ", "ltd", "limited", "inc", "llc", "co"];

/// Status fragments meaning the business is not operating
const INACTIVE_MARKERS: &[&str] = &[
    "inactive",
    "closed",
    "expired",
    "revoked",
    "cancelled",
    "canceled",
    "dissolved",
    "suspended",
    "מחוק",
    "מבוטל",
    "בוטל",
    "בפירוק",
    "פורק",
    "לא פעיל",
    "פג תוקף",
];

/// Decide whether `record` corroborates the business in `request`
pub fn record_matches(
    record: &BusinessRecord,
    request: &VerificationRequest,
    today: NaiveDate,
) -> bool {
    if record.status.as_deref().is_some_and(is_inactive_status) {
        return false;
    }

    if let Some(expiry) = record.expiry.as_deref().and_then(parse_expiry) {
        if expiry < today {
            return false;
        }
    }

    match (request.known_name(), record.name.as_deref()) {
        (Some(known), Some(found)) => names_match(known, found),
        // Without a directory name the record was located by identifier alone
        _ => true,
    }
}

/// Lowercase, drop quote marks, turn punctuation into spaces, drop legal suffixes
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '״' | '׳' | '`'))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !LEGAL_SUFFIXES.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fuzzy name comparison
pub fn names_match(a: &str, b: &str) -> bool {
    let a = normalize_name(a);
    let b = normalize_name(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if shorter.chars().count() >= MIN_CONTAINMENT_LEN && longer.contains(shorter.as_str()) {
        return true;
    }

    strsim::jaro_winkler(&a, &b) >= NAME_SIMILARITY_THRESHOLD
}

pub fn is_inactive_status(status: &str) -> bool {
    let status = status.to_lowercase();
    INACTIVE_MARKERS.iter().any(|marker| status.contains(marker))
}

/// Parse the expiry formats registries use
///
/// Accepts `YYYY-MM-DD` (optionally followed by a time), `DD/MM/YYYY`,
/// `DD.MM.YYYY` and epoch milliseconds.
pub fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if raw.len() >= 12 && raw.chars().all(|c| c.is_ascii_digit()) {
        let millis: i64 = raw.parse().ok()?;
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive());
    }

    if let Some(date_part) = raw.get(..10) {
        if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            return Some(date);
        }
    }

    ["%d/%m/%Y", "%d.%m.%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BusinessId;
    use pulse_common::Business;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn request_for(name: &str) -> VerificationRequest {
        VerificationRequest::new(
            BusinessId::parse("b-1").unwrap(),
            Some(Business::new("b-1", name)),
        )
    }

    fn record(name: &str) -> BusinessRecord {
        BusinessRecord {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_normalize_strips_legal_suffix_and_quotes() {
        assert_eq!(normalize_name("קפה נואר בע\"מ"), "קפה נואר");
        assert_eq!(normalize_name("Cafe-Noir, Ltd."), "cafe noir");
    }

    #[test]
    fn test_names_match_variants() {
        assert!(names_match("Cafe Noir", "CAFE NOIR LTD"));
        assert!(names_match("Miznon", "Miznon Ibn Gabirol"));
        assert!(names_match("Shakshukiya", "Shakshukia"));
        assert!(!names_match("Cafe Noir", "Dizengoff Pharmacy"));
    }

    #[test]
    fn test_short_names_need_fuzzy_match_not_containment() {
        assert!(!names_match("Bar", "Barbershop Florentin"));
    }

    #[test]
    fn test_empty_names_never_match() {
        assert!(!names_match("", "Anything"));
        assert!(!names_match("בע\"מ", "Anything"));
    }

    #[test]
    fn test_inactive_status_markers() {
        assert!(is_inactive_status("CLOSED_PERMANENTLY"));
        assert!(is_inactive_status("חברה מחוקה"));
        assert!(is_inactive_status("Inactive"));
        assert!(!is_inactive_status("OPERATIONAL"));
        assert!(!is_inactive_status("פעילה"));
    }

    #[test]
    fn test_parse_expiry_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(parse_expiry("2026-12-31"), Some(expected));
        assert_eq!(parse_expiry("2026-12-31T00:00:00Z"), Some(expected));
        assert_eq!(parse_expiry("31/12/2026"), Some(expected));
        assert_eq!(parse_expiry("31.12.2026"), Some(expected));
        assert_eq!(parse_expiry("1798675200000"), Some(expected));
        assert_eq!(parse_expiry("permanent"), None);
    }

    #[test]
    fn test_record_matches_similar_name() {
        assert!(record_matches(&record("Cafe Noir Ltd"), &request_for("Cafe Noir"), today()));
    }

    #[test]
    fn test_record_mismatch_on_different_name() {
        assert!(!record_matches(&record("Falafel Gabai"), &request_for("Cafe Noir"), today()));
    }

    #[test]
    fn test_record_mismatch_on_inactive_status() {
        let mut closed = record("Cafe Noir");
        closed.status = Some("CLOSED_PERMANENTLY".to_string());
        assert!(!record_matches(&closed, &request_for("Cafe Noir"), today()));
    }

    #[test]
    fn test_record_mismatch_on_past_expiry() {
        let mut expired = record("Cafe Noir");
        expired.expiry = Some("01/01/2024".to_string());
        assert!(!record_matches(&expired, &request_for("Cafe Noir"), today()));

        expired.expiry = Some("01/01/2030".to_string());
        assert!(record_matches(&expired, &request_for("Cafe Noir"), today()));
    }

    #[test]
    fn test_record_without_profile_matches() {
        let request = VerificationRequest::new(BusinessId::parse("5521").unwrap(), None);
        assert!(record_matches(&record("Any Name"), &request, today()));
    }
}
