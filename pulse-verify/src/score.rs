// Score Policy - quality score and verified flag from per-source outcomes
//
// Pure function of (outcomes, rules, threshold). No I/O, no clock.

use crate::config::VerificationConfig;
use crate::types::{SourceOutcome, SourceResult};

/// Scoring rule for one configured source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRule {
    pub id: String,
    pub name: String,
    pub required: bool,
    pub weight: u32,
    /// Already capped at `weight`
    pub mismatch_weight: u32,
}

/// Score and verdict for one set of outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// 0..=100
    pub score: u8,
    pub verified: bool,
}

/// Threshold plus the ordered rule list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorePolicy {
    pub minimum_score: u8,
    pub rules: Vec<SourceRule>,
}

impl ScorePolicy {
    pub fn from_config(config: &VerificationConfig) -> Self {
        let rules = config
            .sources
            .iter()
            .map(|source| SourceRule {
                id: source.id.clone(),
                name: source.name.clone(),
                required: source.required,
                weight: source.weight,
                mismatch_weight: source.mismatch_weight.min(source.weight),
            })
            .collect();

        Self {
            minimum_score: config.minimum_score.min(100),
            rules,
        }
    }

    /// Sum of all configured weights (the score denominator)
    pub fn total_weight(&self) -> u64 {
        self.rules.iter().map(|r| u64::from(r.weight)).sum()
    }

    /// Names of required sources, in declaration order
    pub fn required_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter(|r| r.required)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Names of optional sources, in declaration order
    pub fn optional_names(&self) -> Vec<String> {
        self.rules
            .iter()
            .filter(|r| !r.required)
            .map(|r| r.name.clone())
            .collect()
    }

    /// Score a set of results
    ///
    /// Results are matched to rules by source id. A rule with no result
    /// earns nothing, and a required rule with no result fails verification.
    /// Results for unknown source ids are ignored.
    pub fn evaluate(&self, results: &[SourceResult]) -> Score {
        let outcome_for = |id: &str| {
            results
                .iter()
                .find(|r| r.source_id == id)
                .map(|r| &r.outcome)
        };

        let earned: u64 = self
            .rules
            .iter()
            .map(|rule| match outcome_for(&rule.id) {
                Some(SourceOutcome::Found { matches: true, .. }) => u64::from(rule.weight),
                Some(SourceOutcome::Found { matches: false, .. }) => {
                    u64::from(rule.mismatch_weight.min(rule.weight))
                }
                _ => 0,
            })
            .sum();

        let total = self.total_weight();
        let score = if total == 0 {
            0
        } else {
            // Integer round-half-up of 100 * earned / total
            ((earned * 100 + total / 2) / total).min(100) as u8
        };

        let required_matched = self
            .rules
            .iter()
            .filter(|rule| rule.required)
            .all(|rule| outcome_for(&rule.id).is_some_and(SourceOutcome::is_match));

        Score {
            score,
            verified: required_matched && score >= self.minimum_score,
        }
    }
}
