//! Request-scoped tenant context.
//!
//! Built once per request from validated gateway headers and passed by
//! reference to every downstream call. All log records on a request path
//! carry the tenant and request ids from here.

use std::time::{Duration, Instant};

/// The tenant id that reads across tenants. Only the configured bypass
/// identity may carry it; every affected log record is marked
/// `cross_tenant_access = true`.
pub const TENANT_WILDCARD: &str = "*";

/// Immutable per-request identity and deadline.
#[derive(Debug, Clone)]
pub struct TenantContext {
    tenant_id: String,
    request_id: String,
    trace_id: Option<String>,
    user_id: Option<String>,
    deadline: Option<Instant>,
}

impl TenantContext {
    /// Creates a context for `tenant_id`, generating a fresh request id.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            request_id: uuid::Uuid::new_v4().to_string(),
            trace_id: None,
            user_id: None,
            deadline: None,
        }
    }

    /// Creates a context from gateway-validated header values.
    pub fn from_headers(
        tenant_id: impl Into<String>,
        request_id: impl Into<String>,
        trace_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            request_id: request_id.into(),
            trace_id,
            user_id,
            deadline: None,
        }
    }

    /// Attaches an overall request deadline.
    pub fn with_deadline(mut self, budget: Duration) -> Self {
        self.deadline = Some(Instant::now() + budget);
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// `true` when this request reads across tenants.
    pub fn is_cross_tenant(&self) -> bool {
        self.tenant_id == TENANT_WILDCARD
    }

    /// Time left before the request deadline. `None` means no deadline was
    /// set; `Some(ZERO)` means the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Caps `budget` by the request deadline, if one is set.
    pub fn budget(&self, budget: Duration) -> Duration {
        match self.remaining() {
            Some(remaining) => budget.min(remaining),
            None => budget,
        }
    }

    /// `true` once the request deadline has passed.
    pub fn expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_request_id() {
        let a = TenantContext::new("t1");
        let b = TenantContext::new("t1");
        assert_ne!(a.request_id(), b.request_id());
        assert_eq!(a.tenant_id(), "t1");
    }

    #[test]
    fn wildcard_is_cross_tenant() {
        assert!(TenantContext::new(TENANT_WILDCARD).is_cross_tenant());
        assert!(!TenantContext::new("acme").is_cross_tenant());
    }

    #[test]
    fn deadline_budget_caps() {
        let ctx = TenantContext::new("t1").with_deadline(Duration::from_millis(50));
        let capped = ctx.budget(Duration::from_secs(10));
        assert!(capped <= Duration::from_millis(50));
        assert!(!ctx.expired());
    }

    #[test]
    fn no_deadline_passes_budget_through() {
        let ctx = TenantContext::new("t1");
        assert_eq!(ctx.budget(Duration::from_millis(300)), Duration::from_millis(300));
        assert!(ctx.remaining().is_none());
        assert!(!ctx.expired());
    }

    #[test]
    fn expired_after_zero_budget() {
        let ctx = TenantContext::new("t1").with_deadline(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(2));
        assert!(ctx.expired());
    }
}
