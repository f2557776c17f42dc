//! Reciprocal Rank Fusion over the two recall paths.
//!
//! RRF makes the fused ordering insensitive to the incompatible score scales
//! of cosine similarity and `ts_rank_cd`: only ranks matter. k = 60 is the
//! conventional constant and is fixed by contract.

use std::collections::HashMap;

use super::model::{CandidateDocument, DocumentFields};
use crate::constants::RRF_K;

/// One row from a single recall path, already ranked (index = rank).
#[derive(Debug, Clone)]
pub struct RankedRow {
    pub candidate_id: String,
    pub tenant_id: String,
    pub score: f64,
    pub fields: DocumentFields,
}

/// Fuses the two ranked pools into a deduplicated, RRF-ordered list.
///
/// Each path contributes `1 / (k + rank)` for every candidate it returned
/// (rank is 1-based). Candidates found by both paths keep both per-path
/// scores.
pub fn rrf_fuse(vector_rows: &[RankedRow], text_rows: &[RankedRow]) -> Vec<CandidateDocument> {
    let mut fused: HashMap<String, CandidateDocument> = HashMap::new();

    for (rank0, row) in vector_rows.iter().enumerate() {
        let contribution = 1.0 / (RRF_K + (rank0 + 1) as f64);
        fused
            .entry(row.candidate_id.clone())
            .and_modify(|doc| {
                doc.vector_score = Some(row.score);
                doc.hybrid_score += contribution;
            })
            .or_insert_with(|| CandidateDocument {
                candidate_id: row.candidate_id.clone(),
                tenant_id: row.tenant_id.clone(),
                vector_score: Some(row.score),
                text_score: None,
                hybrid_score: contribution,
                fields: row.fields.clone(),
            });
    }

    for (rank0, row) in text_rows.iter().enumerate() {
        let contribution = 1.0 / (RRF_K + (rank0 + 1) as f64);
        fused
            .entry(row.candidate_id.clone())
            .and_modify(|doc| {
                doc.text_score = Some(row.score);
                doc.hybrid_score += contribution;
            })
            .or_insert_with(|| CandidateDocument {
                candidate_id: row.candidate_id.clone(),
                tenant_id: row.tenant_id.clone(),
                vector_score: None,
                text_score: Some(row.score),
                hybrid_score: contribution,
                fields: row.fields.clone(),
            });
    }

    let mut documents: Vec<CandidateDocument> = fused.into_values().collect();
    documents.sort_by(|a, b| {
        b.hybrid_score
            .partial_cmp(&a.hybrid_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.candidate_id.cmp(&b.candidate_id))
    });
    documents
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, score: f64) -> RankedRow {
        RankedRow {
            candidate_id: id.to_string(),
            tenant_id: "t1".to_string(),
            score,
            fields: DocumentFields::default(),
        }
    }

    #[test]
    fn both_paths_beat_single_path() {
        let vector = vec![row("a", 0.9), row("b", 0.8)];
        let text = vec![row("b", 12.0), row("c", 8.0)];

        let fused = rrf_fuse(&vector, &text);
        assert_eq!(fused[0].candidate_id, "b");
        assert_eq!(fused.len(), 3);
        assert_eq!(fused[0].vector_score, Some(0.8));
        assert_eq!(fused[0].text_score, Some(12.0));
    }

    #[test]
    fn dedup_by_candidate_id() {
        let vector = vec![row("a", 0.9)];
        let text = vec![row("a", 5.0)];
        let fused = rrf_fuse(&vector, &text);
        assert_eq!(fused.len(), 1);
        let expected = 1.0 / (RRF_K + 1.0) * 2.0;
        assert!((fused[0].hybrid_score - expected).abs() < 1e-12);
    }

    #[test]
    fn single_path_works() {
        let text = vec![row("a", 5.0), row("b", 4.0)];
        let fused = rrf_fuse(&[], &text);
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].candidate_id, "a");
        assert!(fused[0].vector_score.is_none());
    }

    #[test]
    fn ties_break_by_candidate_id() {
        let vector = vec![row("b", 0.5)];
        let text = vec![row("a", 0.5)];
        let fused = rrf_fuse(&vector, &text);
        // Equal RRF contributions; lexicographic id ordering decides.
        assert_eq!(fused[0].candidate_id, "a");
        assert_eq!(fused[1].candidate_id, "b");
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        assert!(rrf_fuse(&[], &[]).is_empty());
    }
}
