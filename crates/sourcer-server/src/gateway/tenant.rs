//! Tenant extraction from gateway-validated headers, plus per-tenant
//! admission control.
//!
//! The upstream gateway owns JWT validation; by the time a request reaches
//! these services the tenant headers are trusted values. Requests without a
//! tenant are rejected. The wildcard tenant is accepted only from the
//! configured bypass identity and flags `cross_tenant_access` on every log
//! record it touches.

use std::collections::HashMap;
use std::time::Instant;

use axum::http::HeaderMap;
use parking_lot::Mutex;

use sourcer::config::HeaderNames;
use sourcer::{TENANT_WILDCARD, TenantContext};

use super::error::GatewayError;

/// Builds the request context from headers. Generates a request id when the
/// gateway did not pass one.
pub fn tenant_context(
    headers: &HeaderMap,
    names: &HeaderNames,
    cross_tenant_identity: Option<&str>,
) -> Result<TenantContext, GatewayError> {
    let tenant = header_value(headers, &names.tenant).ok_or(GatewayError::Unauthenticated)?;
    if tenant.is_empty() {
        return Err(GatewayError::Unauthenticated);
    }

    let user_id = header_value(headers, &names.user_id);

    if tenant == TENANT_WILDCARD {
        let allowed = matches!(
            (cross_tenant_identity, user_id.as_deref()),
            (Some(identity), Some(user)) if identity == user
        );
        if !allowed {
            tracing::warn!(user_id = user_id.as_deref(), "wildcard tenant rejected");
            return Err(GatewayError::Forbidden);
        }
        tracing::info!(
            user_id = user_id.as_deref(),
            cross_tenant_access = true,
            "cross-tenant access granted"
        );
    }

    let request_id = header_value(headers, &names.request_id)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let trace_id = header_value(headers, &names.trace_id);

    Ok(TenantContext::from_headers(
        tenant, request_id, trace_id, user_id,
    ))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Token-bucket admission per tenant. Over-limit requests get a 429 with a
/// retry hint instead of queueing.
pub struct TenantRateLimiter {
    rps: f64,
    burst: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl TenantRateLimiter {
    pub fn new(rps: u32, burst: u32) -> Self {
        Self {
            rps: rps.max(1) as f64,
            burst: burst.max(1) as f64,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Takes one token for `tenant`, or returns the seconds to wait.
    pub fn admit(&self, tenant: &str) -> Result<(), GatewayError> {
        let mut buckets = self.buckets.lock();
        let now = Instant::now();
        let bucket = buckets.entry(tenant.to_string()).or_insert(Bucket {
            tokens: self.burst,
            refilled_at: now,
        });

        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let wait = ((1.0 - bucket.tokens) / self.rps).ceil().max(1.0);
            metrics::counter!("rate_limited_total").increment(1);
            Err(GatewayError::RateLimited {
                retry_after_secs: wait as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn missing_tenant_is_unauthenticated() {
        let err = tenant_context(&headers(&[]), &HeaderNames::default(), None).unwrap_err();
        assert!(matches!(err, GatewayError::Unauthenticated));
    }

    #[test]
    fn tenant_and_ids_extracted() {
        let ctx = tenant_context(
            &headers(&[
                ("x-tenant-id", "acme"),
                ("x-request-id", "req-1"),
                ("x-trace-id", "trace-1"),
                ("x-user-id", "u1"),
            ]),
            &HeaderNames::default(),
            None,
        )
        .unwrap();
        assert_eq!(ctx.tenant_id(), "acme");
        assert_eq!(ctx.request_id(), "req-1");
        assert_eq!(ctx.trace_id(), Some("trace-1"));
        assert_eq!(ctx.user_id(), Some("u1"));
        assert!(!ctx.is_cross_tenant());
    }

    #[test]
    fn request_id_generated_when_absent() {
        let ctx = tenant_context(
            &headers(&[("x-tenant-id", "acme")]),
            &HeaderNames::default(),
            None,
        )
        .unwrap();
        assert!(!ctx.request_id().is_empty());
    }

    #[test]
    fn wildcard_requires_bypass_identity() {
        let names = HeaderNames::default();
        let err = tenant_context(&headers(&[("x-tenant-id", "*")]), &names, Some("auditor"))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden));

        let err = tenant_context(
            &headers(&[("x-tenant-id", "*"), ("x-user-id", "someone-else")]),
            &names,
            Some("auditor"),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden));

        let ctx = tenant_context(
            &headers(&[("x-tenant-id", "*"), ("x-user-id", "auditor")]),
            &names,
            Some("auditor"),
        )
        .unwrap();
        assert!(ctx.is_cross_tenant());
    }

    #[test]
    fn wildcard_rejected_when_no_identity_configured() {
        let err = tenant_context(
            &headers(&[("x-tenant-id", "*"), ("x-user-id", "auditor")]),
            &HeaderNames::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Forbidden));
    }

    #[test]
    fn custom_header_names() {
        let names = HeaderNames {
            tenant: "x-org".to_string(),
            ..HeaderNames::default()
        };
        let ctx = tenant_context(&headers(&[("x-org", "acme")]), &names, None).unwrap();
        assert_eq!(ctx.tenant_id(), "acme");
    }

    #[test]
    fn rate_limiter_enforces_burst() {
        let limiter = TenantRateLimiter::new(1, 2);
        assert!(limiter.admit("t1").is_ok());
        assert!(limiter.admit("t1").is_ok());
        let err = limiter.admit("t1").unwrap_err();
        assert!(matches!(err, GatewayError::RateLimited { .. }));
        // Other tenants have their own buckets.
        assert!(limiter.admit("t2").is_ok());
    }
}
