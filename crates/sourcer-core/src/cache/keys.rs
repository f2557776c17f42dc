//! Cache namespaces and key construction.
//!
//! Every key embeds the tenant and a schema version suffix, so a layout
//! change never reads stale-shaped payloads.

/// Bumped whenever a cached payload shape changes.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// The closed set of cache namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Query-embedding cache (jd_hash + model_version → vector).
    Embed,
    /// Full hybrid search responses.
    Hybrid,
    /// Rerank orderings.
    Rerank,
    /// Evidence payloads fetched for rationale assembly.
    Evidence,
    /// Scheduler/messaging payloads.
    Msgs,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Embed => "embed",
            Namespace::Hybrid => "hybrid",
            Namespace::Rerank => "rerank",
            Namespace::Evidence => "evidence",
            Namespace::Msgs => "msgs",
        }
    }
}

/// Builds `{ns}:{tenant}:{suffix}:v{version}`.
pub fn cache_key(namespace: Namespace, tenant_id: &str, suffix: &str) -> String {
    format!(
        "{}:{}:{}:v{}",
        namespace.as_str(),
        tenant_id,
        suffix,
        CACHE_SCHEMA_VERSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_shape() {
        let key = cache_key(Namespace::Rerank, "acme", "jd:ds");
        assert_eq!(key, format!("rerank:acme:jd:ds:v{CACHE_SCHEMA_VERSION}"));
    }

    #[test]
    fn namespaces_are_distinct() {
        let namespaces = [
            Namespace::Embed,
            Namespace::Hybrid,
            Namespace::Rerank,
            Namespace::Evidence,
            Namespace::Msgs,
        ];
        let labels: std::collections::HashSet<_> =
            namespaces.iter().map(|n| n.as_str()).collect();
        assert_eq!(labels.len(), namespaces.len());
    }
}
