//! Skill alias normalization and the transferability graph.
//!
//! Both tables are closed: matching happens against normalized names only,
//! and inference follows explicit weighted edges, never string similarity.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Canonicalizes a skill name: trim, lowercase, then alias resolution.
pub fn normalize(skill: &str) -> String {
    let lower = skill.trim().to_lowercase();
    aliases().get(lower.as_str()).map_or(lower, |s| s.to_string())
}

/// `true` when `candidate` and `required` normalize to the same skill.
pub fn exact_match(candidate: &str, required: &str) -> bool {
    normalize(candidate) == normalize(required)
}

/// Best transfer weight from any of `candidate_skills` (normalized) to
/// `required` (normalized). An exact match returns 1.0; no edge returns 0.
pub fn transfer_weight(candidate_skills: &[String], required: &str) -> f64 {
    let required = normalize(required);
    let mut best: f64 = 0.0;
    for candidate in candidate_skills {
        let candidate = normalize(candidate);
        if candidate == required {
            return 1.0;
        }
        if let Some(weight) = graph().get(&(candidate.as_str(), required.as_str())) {
            best = best.max(*weight);
        }
        // The graph is stored directed both ways where transfer is
        // symmetric, so no reverse lookup here.
    }
    best
}

fn aliases() -> &'static HashMap<&'static str, &'static str> {
    static ALIASES: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        HashMap::from([
            ("golang", "go"),
            ("postgresql", "postgres"),
            ("psql", "postgres"),
            ("k8s", "kubernetes"),
            ("js", "javascript"),
            ("ts", "typescript"),
            ("node", "nodejs"),
            ("node.js", "nodejs"),
            ("react.js", "react"),
            ("reactjs", "react"),
            ("gcp", "google cloud"),
            ("amazon web services", "aws"),
            ("ml", "machine learning"),
        ])
    })
}

type Edge = (&'static str, &'static str);

fn graph() -> &'static HashMap<Edge, f64> {
    static GRAPH: OnceLock<HashMap<Edge, f64>> = OnceLock::new();
    GRAPH.get_or_init(|| {
        let edges: &[(Edge, f64)] = &[
            (("go", "rust"), 0.7),
            (("rust", "go"), 0.7),
            (("java", "kotlin"), 0.8),
            (("kotlin", "java"), 0.8),
            (("java", "go"), 0.6),
            (("python", "go"), 0.5),
            (("javascript", "typescript"), 0.9),
            (("typescript", "javascript"), 0.9),
            (("postgres", "mysql"), 0.8),
            (("mysql", "postgres"), 0.8),
            (("postgres", "sql"), 0.9),
            (("kafka", "rabbitmq"), 0.7),
            (("rabbitmq", "kafka"), 0.7),
            (("kafka", "pubsub"), 0.7),
            (("kubernetes", "docker"), 0.8),
            (("docker", "kubernetes"), 0.6),
            (("aws", "google cloud"), 0.7),
            (("google cloud", "aws"), 0.7),
            (("react", "vue"), 0.7),
            (("vue", "react"), 0.7),
            (("grpc", "rest"), 0.6),
            (("terraform", "pulumi"), 0.8),
        ];
        edges.iter().copied().collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve() {
        assert_eq!(normalize("Golang"), "go");
        assert_eq!(normalize("PostgreSQL"), "postgres");
        assert_eq!(normalize(" K8s "), "kubernetes");
        assert_eq!(normalize("Rust"), "rust");
    }

    #[test]
    fn exact_match_through_aliases() {
        assert!(exact_match("golang", "Go"));
        assert!(exact_match("k8s", "Kubernetes"));
        assert!(!exact_match("go", "rust"));
    }

    #[test]
    fn transfer_uses_best_edge() {
        let candidate = vec!["rust".to_string(), "python".to_string()];
        let weight = transfer_weight(&candidate, "go");
        assert!((weight - 0.7).abs() < 1e-9);
    }

    #[test]
    fn exact_beats_inferred() {
        let candidate = vec!["go".to_string()];
        assert_eq!(transfer_weight(&candidate, "golang"), 1.0);
    }

    #[test]
    fn no_edge_means_zero() {
        let candidate = vec!["react".to_string()];
        assert_eq!(transfer_weight(&candidate, "kafka"), 0.0);
    }

    #[test]
    fn all_edge_weights_bounded() {
        for weight in graph().values() {
            assert!(*weight > 0.0 && *weight <= 1.0);
        }
    }
}
