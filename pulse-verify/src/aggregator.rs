//! Verification aggregator
//!
//! Runs every configured source adapter concurrently for one business and
//! scores the combined outcomes. No adapter can abort the others: a failing
//! or slow source only contributes `SourceOutcome::Error`.

use crate::config::VerificationConfig;
use crate::score::ScorePolicy;
use crate::sources::{build_adapter, SourceAdapter};
use crate::types::{AdapterError, SourceOutcome, SourceResult, VerificationReport, VerificationRequest};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct Aggregator {
    config: Arc<VerificationConfig>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    policy: ScorePolicy,
}

impl Aggregator {
    /// Build adapters for every configured source
    pub fn from_config(config: Arc<VerificationConfig>) -> Result<Self, AdapterError> {
        let adapters = config
            .sources
            .iter()
            .map(|source| build_adapter(source, &config))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_adapters(config, adapters)
    }

    /// Use pre-built adapters (one per configured source, same order)
    pub fn with_adapters(
        config: Arc<VerificationConfig>,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Result<Self, AdapterError> {
        if adapters.len() != config.sources.len() {
            return Err(AdapterError::NotConfigured(format!(
                "{} adapters for {} configured sources",
                adapters.len(),
                config.sources.len()
            )));
        }

        for (adapter, source) in adapters.iter().zip(&config.sources) {
            if adapter.id() != source.id {
                return Err(AdapterError::NotConfigured(format!(
                    "adapter '{}' is in the slot of source '{}'",
                    adapter.id(),
                    source.id
                )));
            }
        }

        let policy = ScorePolicy::from_config(&config);
        Ok(Self {
            config,
            adapters,
            policy,
        })
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    pub fn adapter_count(&self) -> usize {
        self.adapters.len()
    }

    /// Query all sources and build the report
    ///
    /// Always returns a report; results keep adapter declaration order.
    pub async fn verify(&self, request: &VerificationRequest) -> VerificationReport {
        let timeout = self.config.source_timeout();

        let futures = self
            .adapters
            .iter()
            .map(|adapter| run_adapter(Arc::clone(adapter), request, timeout));

        let sources: Vec<SourceResult> = join_all(futures).await;
        let score = self.policy.evaluate(&sources);

        let matched = sources.iter().filter(|s| s.outcome.is_match()).count();
        let errors = sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Error { .. }))
            .count();
        info!(
            business_id = %request.business_id,
            verified = score.verified,
            quality_score = score.score,
            sources = sources.len(),
            matched,
            errors,
            "Verification complete"
        );

        VerificationReport {
            business_id: request.business_id.clone(),
            verified: score.verified,
            quality_score: score.score,
            sources,
            generated_at: Utc::now(),
        }
    }
}

async fn run_adapter(
    adapter: Arc<dyn SourceAdapter>,
    request: &VerificationRequest,
    timeout: Duration,
) -> SourceResult {
    let outcome = match tokio::time::timeout(timeout, adapter.lookup(request)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!(
                source = adapter.id(),
                business_id = %request.business_id,
                timeout_secs = timeout.as_secs(),
                "Source timed out (isolated)"
            );
            SourceOutcome::error(format!("timed out after {}s", timeout.as_secs()))
        }
    };

    SourceResult {
        source_id: adapter.id().to_string(),
        source_name: adapter.name().to_string(),
        checked_at: Utc::now(),
        outcome,
    }
}

// ============================================================================
// Mock adapters for testing
// ============================================================================
