//! Uniform dispatch to the live data providers with caching, shared rate
//! limits, and bounded retry.

pub mod bea;
pub mod bls;
pub mod limit;
pub mod registry;

use crate::cache::key::call_key;
use crate::errors::FailureReason;
use crate::model::CallParams;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use limit::RateLimitBudget;
use registry::{FunctionRegistry, FunctionSpec, ProviderFamily};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn family(&self) -> ProviderFamily;
    async fn fetch(
        &self,
        spec: &FunctionSpec,
        params: &CallParams,
    ) -> anyhow::Result<serde_json::Value>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallOutcome {
    pub success: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
    pub reason: Option<FailureReason>,
    pub cached: bool,
}

impl CallOutcome {
    pub fn failure(reason: FailureReason, error: String) -> Self {
        Self {
            success: false,
            payload: serde_json::Value::Null,
            error: Some(error),
            reason: Some(reason),
            cached: false,
        }
    }
}

/// Provider-level success marker for a payload that arrived over HTTP 200.
pub fn payload_ok(family: ProviderFamily, payload: &serde_json::Value) -> bool {
    match family {
        ProviderFamily::LaborStatistics => payload
            .get("status")
            .and_then(|v| v.as_str())
            .map_or(false, |s| s == "REQUEST_SUCCEEDED"),
        ProviderFamily::EconomicAnalysis => payload.pointer("/BEAAPI/Results").is_some(),
    }
}

/// Whether a successful payload actually carries observations.
pub fn payload_has_data(family: ProviderFamily, payload: &serde_json::Value) -> bool {
    let data = match family {
        ProviderFamily::LaborStatistics => payload.pointer("/Results/series/0/data"),
        ProviderFamily::EconomicAnalysis => payload.pointer("/BEAAPI/Results/Data"),
    };
    data.and_then(|d| d.as_array()).map_or(false, |a| !a.is_empty())
}

pub struct ApiExecutor {
    registry: Arc<FunctionRegistry>,
    labor: Arc<dyn ProviderClient>,
    economic: Arc<dyn ProviderClient>,
    labor_budget: RateLimitBudget,
    economic_budget: RateLimitBudget,
    cache: moka::sync::Cache<String, CallOutcome>,
    retry: RetryPolicy,
    live_calls: AtomicU64,
}

impl ApiExecutor {
    pub fn new(
        registry: Arc<FunctionRegistry>,
        labor: Arc<dyn ProviderClient>,
        economic: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            registry,
            labor,
            economic,
            // Published provider quotas: registered keys get 500 requests per
            // day on the labor side and 100 per minute on the economic side.
            labor_budget: RateLimitBudget::per_day(500),
            economic_budget: RateLimitBudget::per_minute(100),
            cache: moka::sync::Cache::new(4096),
            retry: RetryPolicy::default(),
            live_calls: AtomicU64::new(0),
        }
    }

    pub fn with_budgets(mut self, labor: RateLimitBudget, economic: RateLimitBudget) -> Self {
        self.labor_budget = labor;
        self.economic_budget = economic;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    /// Network attempts issued so far (cache hits excluded).
    pub fn live_calls(&self) -> u64 {
        self.live_calls.load(Ordering::Relaxed)
    }

    /// Dispatches a validated call. Identical (function, sorted parameters)
    /// shapes are served from cache; live data may shift between calls, so
    /// this is what keeps repeated ground-truth lookups reproducible.
    pub async fn call(&self, name: &str, params: &CallParams) -> CallOutcome {
        let Some(spec) = self.registry.get(name) else {
            return CallOutcome::failure(
                FailureReason::UnknownFunction,
                format!("unknown function: {}", name),
            );
        };

        let merged = spec.apply_defaults(params);
        let key = call_key(name, &merged);
        if let Some(mut hit) = self.cache.get(&key) {
            tracing::debug!(function = name, "serving call from cache");
            hit.cached = true;
            return hit;
        }

        let budget = match spec.family {
            ProviderFamily::LaborStatistics => &self.labor_budget,
            ProviderFamily::EconomicAnalysis => &self.economic_budget,
        };
        if let Err(reason) = budget.acquire().await {
            // Rejections are not cached: the budget may free up later.
            return CallOutcome::failure(
                reason,
                format!("{} rate-limit budget exhausted", spec.family.as_str()),
            );
        }

        let client = match spec.family {
            ProviderFamily::LaborStatistics => &self.labor,
            ProviderFamily::EconomicAnalysis => &self.economic,
        };

        let result = self
            .retry
            .run(|| {
                self.live_calls.fetch_add(1, Ordering::Relaxed);
                client.fetch(spec, &merged)
            })
            .await;

        let outcome = match result {
            Ok(payload) => {
                let success = payload_ok(spec.family, &payload);
                if !success {
                    tracing::warn!(function = name, "provider reported an unsuccessful response");
                }
                CallOutcome {
                    success,
                    payload,
                    error: if success {
                        None
                    } else {
                        Some("provider reported an unsuccessful response".to_string())
                    },
                    reason: if success {
                        None
                    } else {
                        Some(FailureReason::ApiExecutionError)
                    },
                    cached: false,
                }
            }
            Err(exhausted) => {
                tracing::warn!(function = name, error = %exhausted, "call failed after retries");
                CallOutcome::failure(FailureReason::ApiExecutionError, exhausted.to_string())
            }
        };

        self.cache.insert(key, outcome.clone());
        outcome
    }
}
