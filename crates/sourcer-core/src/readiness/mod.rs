//! Lazy initialization and readiness tracking.
//!
//! Services open their listening socket immediately; dependency probes run
//! in the background with bounded retries. `/ready` reports `initializing`
//! until every required dependency succeeds, and `degraded` (not an error)
//! when a dependency exhausts its retries. A fatal init failure (schema
//! mismatch) is surfaced so the binary can exit non-zero.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// Status of one tracked dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Initializing,
    Ok,
    Degraded { reason: String },
    Failed { reason: String },
}

impl DependencyStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DependencyStatus::Initializing => "initializing",
            DependencyStatus::Ok => "ok",
            DependencyStatus::Degraded { .. } => "degraded",
            DependencyStatus::Failed { .. } => "failed",
        }
    }
}

/// Aggregate process state derived from the dependency map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Initializing,
    Ok,
    Degraded,
}

impl ReadyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadyState::Initializing => "initializing",
            ReadyState::Ok => "ok",
            ReadyState::Degraded => "degraded",
        }
    }
}

/// Error returned by an init closure.
#[derive(Debug)]
pub struct InitError {
    pub reason: String,
    /// Fatal errors (schema mismatch) stop retrying immediately; the binary
    /// is expected to exit.
    pub fatal: bool,
}

impl InitError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fatal: false,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            fatal: true,
        }
    }
}

/// Retry schedule for background initialization.
#[derive(Debug, Clone, Copy)]
pub struct InitRetrySchedule {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for InitRetrySchedule {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

/// Shared readiness tracker.
pub struct Readiness {
    deps: RwLock<BTreeMap<&'static str, DependencyStatus>>,
}

impl Readiness {
    /// Creates a tracker with every dependency `Initializing`.
    pub fn new(dependencies: &[&'static str]) -> Arc<Self> {
        let deps = dependencies
            .iter()
            .map(|name| (*name, DependencyStatus::Initializing))
            .collect();
        Arc::new(Self {
            deps: RwLock::new(deps),
        })
    }

    pub fn set(&self, dependency: &'static str, status: DependencyStatus) {
        self.deps.write().insert(dependency, status);
    }

    pub fn get(&self, dependency: &str) -> Option<DependencyStatus> {
        self.deps.read().get(dependency).cloned()
    }

    /// Aggregate state: `Ok` only when every dependency is `Ok`;
    /// `Initializing` while any probe is still running and nothing has
    /// degraded or failed.
    pub fn state(&self) -> ReadyState {
        let deps = self.deps.read();
        if deps
            .values()
            .any(|s| matches!(s, DependencyStatus::Degraded { .. } | DependencyStatus::Failed { .. }))
        {
            return ReadyState::Degraded;
        }
        if deps
            .values()
            .any(|s| matches!(s, DependencyStatus::Initializing))
        {
            return ReadyState::Initializing;
        }
        ReadyState::Ok
    }

    /// `true` when any dependency failed fatally.
    pub fn has_fatal(&self) -> bool {
        self.deps
            .read()
            .values()
            .any(|s| matches!(s, DependencyStatus::Failed { .. }))
    }

    /// Per-dependency labels plus reasons, for the health payload.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.deps
            .read()
            .iter()
            .map(|(name, status)| {
                let value = match status {
                    DependencyStatus::Degraded { reason } => format!("degraded: {reason}"),
                    DependencyStatus::Failed { reason } => format!("failed: {reason}"),
                    other => other.label().to_string(),
                };
                (name.to_string(), value)
            })
            .collect()
    }
}

impl std::fmt::Debug for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Readiness")
            .field("state", &self.state().as_str())
            .finish()
    }
}

/// Runs `probe` with bounded retries and exponential backoff, updating
/// `readiness` as it goes. Returns once the dependency is `Ok`, `Degraded`
/// (retries exhausted), or `Failed` (fatal).
pub async fn init_with_retries<F, Fut>(
    readiness: Arc<Readiness>,
    dependency: &'static str,
    schedule: InitRetrySchedule,
    mut probe: F,
) where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<(), InitError>> + Send,
{
    let mut last_reason = String::new();
    for attempt in 0..schedule.max_attempts {
        match probe().await {
            Ok(()) => {
                tracing::info!(dependency, attempt, "dependency ready");
                readiness.set(dependency, DependencyStatus::Ok);
                return;
            }
            Err(error) if error.fatal => {
                tracing::error!(dependency, reason = %error.reason, "fatal init failure");
                readiness.set(
                    dependency,
                    DependencyStatus::Failed {
                        reason: error.reason,
                    },
                );
                return;
            }
            Err(error) => {
                last_reason = error.reason;
                let backoff = schedule
                    .base_delay
                    .saturating_mul(2_u32.saturating_pow(attempt))
                    .min(schedule.max_delay);
                tracing::warn!(
                    dependency,
                    attempt,
                    reason = %last_reason,
                    backoff_ms = backoff.as_millis() as u64,
                    "dependency init failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
    readiness.set(
        dependency,
        DependencyStatus::Degraded {
            reason: last_reason,
        },
    );
}
