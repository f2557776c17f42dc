//! BLAKE3 fingerprints for cache keys and change detection.
//!
//! All keys are content-addressed: identical inputs always produce identical
//! keys, and any input change (including weights or model version bumps)
//! produces a new key. Hex digests are truncated to 16 bytes for key
//! compactness; collision risk at that width is negligible for corpus sizes
//! in the 10^4–10^6 range.

use blake3::Hasher;

/// Canonical job-description fingerprint: whitespace-collapsed, lowercased,
/// then hashed. Stable under reformatting of the same JD text.
pub fn job_fingerprint(jd_text: &str) -> String {
    let mut normalized = String::with_capacity(jd_text.len());
    let mut last_was_space = true;
    for ch in jd_text.trim().chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                normalized.push(' ');
                last_was_space = true;
            }
        } else {
            for lower in ch.to_lowercase() {
                normalized.push(lower);
            }
            last_was_space = false;
        }
    }
    short_hex(blake3::hash(normalized.as_bytes()))
}

/// Full 32-byte hash of a searchable-profile serialization. Used for upsert
/// short-circuiting, so it must cover every byte of the canonical text.
pub fn text_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// 64-bit tenant hash for log correlation and metric labels.
pub fn hash_tenant_id(tenant: &str) -> u64 {
    let hash = blake3::hash(tenant.as_bytes());
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Hash of a rerank docset: candidate ids plus their rationale-input hashes,
/// order-insensitive (ids are sorted before hashing).
pub fn docset_hash(docs: &[(String, String)]) -> String {
    let mut sorted: Vec<&(String, String)> = docs.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut hasher = Hasher::new();
    for (candidate_id, rationale_input) in sorted {
        hasher.update(candidate_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(blake3::hash(rationale_input.as_bytes()).as_bytes());
        hasher.update(b"\x1e");
    }
    short_hex(hasher.finalize())
}

/// Deterministic rerank cache key. Identical inputs must produce identical
/// orderings, so every ordering-relevant input participates.
pub fn rerank_cache_key(
    tenant_id: &str,
    jd_hash: &str,
    docset_hash: &str,
    model_version: &str,
    weights_version: &str,
) -> String {
    let mut hasher = Hasher::new();
    for part in [tenant_id, jd_hash, docset_hash, model_version, weights_version] {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    short_hex(hasher.finalize())
}

fn short_hex(hash: blake3::Hash) -> String {
    hash.to_hex()[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn job_fingerprint_normalizes_whitespace_and_case() {
        let a = job_fingerprint("Senior Go   Backend\n Engineer");
        let b = job_fingerprint("  senior go backend engineer ");
        assert_eq!(a, b);
    }

    #[test]
    fn job_fingerprint_distinguishes_content() {
        let a = job_fingerprint("senior go engineer");
        let b = job_fingerprint("senior rust engineer");
        assert_ne!(a, b);
    }

    #[test]
    fn text_hash_is_full_width() {
        assert_eq!(text_hash("abc").len(), 64);
        assert_ne!(text_hash("abc"), text_hash("abd"));
    }

    #[test]
    fn tenant_hash_is_stable() {
        assert_eq!(hash_tenant_id("acme"), hash_tenant_id("acme"));
        assert_ne!(hash_tenant_id("acme"), hash_tenant_id("acme2"));
    }

    #[test]
    fn docset_hash_order_insensitive() {
        let forward = vec![
            ("c1".to_string(), "go, postgres".to_string()),
            ("c2".to_string(), "react".to_string()),
        ];
        let reversed: Vec<_> = forward.iter().cloned().rev().collect();
        assert_eq!(docset_hash(&forward), docset_hash(&reversed));
    }

    #[test]
    fn docset_hash_content_sensitive() {
        let base = vec![("c1".to_string(), "go".to_string())];
        let changed = vec![("c1".to_string(), "rust".to_string())];
        assert_ne!(docset_hash(&base), docset_hash(&changed));
    }

    #[test]
    fn rerank_key_varies_with_every_component() {
        let base = rerank_cache_key("t1", "jd", "ds", "m1", "wv1");
        let keys = [
            rerank_cache_key("t2", "jd", "ds", "m1", "wv1"),
            rerank_cache_key("t1", "jd2", "ds", "m1", "wv1"),
            rerank_cache_key("t1", "jd", "ds2", "m1", "wv1"),
            rerank_cache_key("t1", "jd", "ds", "m2", "wv1"),
            rerank_cache_key("t1", "jd", "ds", "m1", "wv2"),
        ];
        let mut unique: HashSet<String> = keys.into_iter().collect();
        unique.insert(base);
        assert_eq!(unique.len(), 6);
    }
}
