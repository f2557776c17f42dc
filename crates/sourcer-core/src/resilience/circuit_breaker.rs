//! Circuit breaker for failing dependencies.
//!
//! Opens after a threshold of consecutive failures, rejects calls for a
//! cooldown period, then half-opens to let a single probe through. A probe
//! success closes the circuit; a probe failure re-opens it.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::BreakerConfig;

/// Current state of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed,
    /// Requests are rejected until the cooldown elapses.
    Open,
    /// One probe request is allowed through.
    HalfOpen,
}

impl CircuitState {
    /// Stable label for logs and health payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Per-provider circuit breaker.
pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    state: Mutex<Inner>,
    consecutive_failures: AtomicU32,
}

struct Inner {
    state: CircuitState,
    last_transition: Instant,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            name,
            config,
            state: Mutex::new(Inner {
                state: CircuitState::Closed,
                last_transition: Instant::now(),
            }),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// Returns `true` if a call may proceed. Transitions Open → HalfOpen when
    /// the cooldown has elapsed.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.state.lock();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if inner.last_transition.elapsed() >= self.config.cooldown {
                    inner.state = CircuitState::HalfOpen;
                    inner.last_transition = Instant::now();
                    tracing::info!(provider = self.name, "circuit half-open, probing");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut inner = self.state.lock();
        if inner.state != CircuitState::Closed {
            tracing::info!(provider = self.name, "circuit closed");
            inner.state = CircuitState::Closed;
            inner.last_transition = Instant::now();
        }
    }

    pub fn record_failure(&self) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        let mut inner = self.state.lock();
        match inner.state {
            CircuitState::Closed => {
                if failures >= self.config.failure_threshold {
                    tracing::warn!(
                        provider = self.name,
                        failures,
                        cooldown_ms = self.config.cooldown.as_millis() as u64,
                        "circuit opened"
                    );
                    inner.state = CircuitState::Open;
                    inner.last_transition = Instant::now();
                }
            }
            CircuitState::HalfOpen => {
                tracing::warn!(provider = self.name, "probe failed, circuit re-opened");
                inner.state = CircuitState::Open;
                inner.last_transition = Instant::now();
            }
            CircuitState::Open => {}
        }
    }

    pub fn current_state(&self) -> CircuitState {
        self.state.lock().state
    }

    pub fn is_healthy(&self) -> bool {
        self.current_state() == CircuitState::Closed
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("state", &self.current_state())
            .finish()
    }
}
