//! Typed client for the ML trajectory inference service.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::TrajectoryError;
use crate::config::BreakerConfig;
use crate::context::TenantContext;
use crate::resilience::CircuitBreaker;

/// Expected tenure window in months.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TenureRange {
    pub min: u32,
    pub max: u32,
}

/// One prediction from the ML service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryPrediction {
    pub next_role: String,
    pub next_role_confidence: f64,
    pub tenure_months: TenureRange,
    pub hireability: f64,
    #[serde(default)]
    pub low_confidence: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_reason: Option<String>,
}

/// The client contract the orchestrator consumes. Implementations must
/// return an empty map on any failure path they choose to absorb; the
/// orchestrator additionally absorbs every error.
#[async_trait]
pub trait TrajectoryApi: Send + Sync {
    async fn predict(
        &self,
        ctx: &TenantContext,
        candidate_ids: &[String],
    ) -> Result<HashMap<String, TrajectoryPrediction>, TrajectoryError>;

    /// `true` while the breaker is closed.
    fn is_healthy(&self) -> bool;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictRequest<'a> {
    tenant_id: &'a str,
    candidate_ids: &'a [String],
}

#[derive(Deserialize)]
struct PredictResponse {
    predictions: HashMap<String, TrajectoryPrediction>,
}

/// HTTP client with a tight timeout budget and a circuit breaker.
pub struct HttpTrajectoryClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    breaker: CircuitBreaker,
}

impl HttpTrajectoryClient {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        breaker_config: BreakerConfig,
    ) -> Result<Self, TrajectoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| TrajectoryError::Unavailable {
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            timeout,
            breaker: CircuitBreaker::new("ml-trajectory", breaker_config),
        })
    }

    async fn call(
        &self,
        ctx: &TenantContext,
        candidate_ids: &[String],
    ) -> Result<HashMap<String, TrajectoryPrediction>, TrajectoryError> {
        let url = format!(
            "{}/trajectory/predict",
            self.base_url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .json(&PredictRequest {
                tenant_id: ctx.tenant_id(),
                candidate_ids,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TrajectoryError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    TrajectoryError::Unavailable {
                        message: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(TrajectoryError::Unavailable {
                message: format!("trajectory service returned {}", response.status()),
            });
        }

        let body: PredictResponse =
            response
                .json()
                .await
                .map_err(|e| TrajectoryError::Malformed {
                    reason: e.to_string(),
                })?;
        Ok(body.predictions)
    }
}

#[async_trait]
impl TrajectoryApi for HttpTrajectoryClient {
    async fn predict(
        &self,
        ctx: &TenantContext,
        candidate_ids: &[String],
    ) -> Result<HashMap<String, TrajectoryPrediction>, TrajectoryError> {
        if candidate_ids.is_empty() {
            return Ok(HashMap::new());
        }
        if !self.breaker.allow_request() {
            return Err(TrajectoryError::CircuitOpen);
        }

        match self.call(ctx, candidate_ids).await {
            Ok(predictions) => {
                self.breaker.record_success();
                Ok(predictions)
            }
            Err(error) => {
                self.breaker.record_failure();
                Err(error)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.breaker.is_healthy()
    }
}

impl std::fmt::Debug for HttpTrajectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTrajectoryClient")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout.as_millis())
            .finish()
    }
}

/// Scripted client for tests.
#[cfg(any(test, feature = "mock"))]
pub struct MockTrajectoryClient {
    predictions: parking_lot::Mutex<HashMap<String, TrajectoryPrediction>>,
    fail: std::sync::atomic::AtomicBool,
    delay: parking_lot::Mutex<Option<Duration>>,
    pub calls: std::sync::atomic::AtomicU32,
}

#[cfg(any(test, feature = "mock"))]
impl MockTrajectoryClient {
    pub fn new() -> Self {
        Self {
            predictions: parking_lot::Mutex::new(HashMap::new()),
            fail: std::sync::atomic::AtomicBool::new(false),
            delay: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn set_prediction(&self, candidate_id: &str, prediction: TrajectoryPrediction) {
        self.predictions
            .lock()
            .insert(candidate_id.to_string(), prediction);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Makes every call sleep, to exercise the orchestrator's ML budget.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }
}

#[cfg(any(test, feature = "mock"))]
impl Default for MockTrajectoryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl TrajectoryApi for MockTrajectoryClient {
    async fn predict(
        &self,
        _ctx: &TenantContext,
        candidate_ids: &[String],
    ) -> Result<HashMap<String, TrajectoryPrediction>, TrajectoryError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(TrajectoryError::Unavailable {
                message: "mock failure".to_string(),
            });
        }
        let predictions = self.predictions.lock();
        Ok(candidate_ids
            .iter()
            .filter_map(|id| predictions.get(id).map(|p| (id.clone(), p.clone())))
            .collect())
    }

    fn is_healthy(&self) -> bool {
        !self.fail.load(std::sync::atomic::Ordering::SeqCst)
    }
}
