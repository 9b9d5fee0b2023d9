//! Connectivity Prober: one-shot test calls against a provider/model pair.
//!
//! The probe carries the provider's own configured timeout. A locally elapsed
//! timeout is a structured failure outcome (it is cached like a backend
//! "connection failed" response); a transport rejection propagates as an
//! error and is not cached.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::Result;
use crate::models::ProviderRecord;
use crate::rpc::{ConfigRpc, TestOutcome};
use crate::utils::now_rfc3339;

/// Sentinel model component for probes issued without a model override.
pub const DEFAULT_MODEL_KEY: &str = "default";

/// Cache key for the latest test result of a provider/model pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProbeKey {
    provider_id: String,
    model: String,
}

impl ProbeKey {
    pub fn new(provider_id: &str, model: Option<&str>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            model: model.unwrap_or(DEFAULT_MODEL_KEY).to_string(),
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }
}

impl fmt::Display for ProbeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider_id, self.model)
    }
}

/// Latest observed outcome for a probe key. No history is retained.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum TestResult {
    Passed { latency_ms: u64, checked_at: String },
    Failed { message: String, checked_at: String },
}

impl TestResult {
    pub fn from_outcome(outcome: &TestOutcome) -> Self {
        let checked_at = now_rfc3339();
        if outcome.success {
            TestResult::Passed {
                latency_ms: outcome.latency_ms.unwrap_or(0),
                checked_at,
            }
        } else {
            TestResult::Failed {
                message: outcome
                    .message
                    .clone()
                    .unwrap_or_else(|| "connection failed".to_string()),
                checked_at,
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestResult::Passed { .. })
    }
}

/// Issues one probe call, bounded by the provider's configured timeout.
pub async fn run_probe(
    rpc: &dyn ConfigRpc,
    provider: &ProviderRecord,
    model: Option<&str>,
) -> Result<TestOutcome> {
    let limit = Duration::from_secs(provider.params.timeout_secs.max(1));
    match tokio::time::timeout(limit, rpc.test_provider(&provider.id, model)).await {
        Ok(result) => result,
        Err(_) => Ok(TestOutcome {
            success: false,
            latency_ms: None,
            message: Some(format!(
                "probe timed out after {}s",
                limit.as_secs()
            )),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_default_sentinel_without_model() {
        assert_eq!(ProbeKey::new("a", None).to_string(), "a:default");
        assert_eq!(ProbeKey::new("a", Some("m1")).to_string(), "a:m1");
        assert_ne!(ProbeKey::new("a", Some("m1")), ProbeKey::new("a", Some("m2")));
    }

    #[test]
    fn outcome_classification() {
        let passed = TestResult::from_outcome(&TestOutcome {
            success: true,
            latency_ms: Some(42),
            message: None,
        });
        assert!(passed.is_success());
        match passed {
            TestResult::Passed { latency_ms, .. } => assert_eq!(latency_ms, 42),
            TestResult::Failed { .. } => panic!("expected passed"),
        }

        let failed = TestResult::from_outcome(&TestOutcome {
            success: false,
            latency_ms: None,
            message: Some("timeout".to_string()),
        });
        assert!(!failed.is_success());
        match failed {
            TestResult::Failed { message, .. } => assert_eq!(message, "timeout"),
            TestResult::Passed { .. } => panic!("expected failed"),
        }
    }
}
