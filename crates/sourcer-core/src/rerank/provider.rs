//! Rerank providers: the LLM-backed implementation and a test double.

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatRequest};
use serde::{Deserialize, Serialize};

use super::error::RerankError;
use super::parse::parse_rerank_response;

/// One candidate handed to the reranker: id plus the minimal rationale input
/// (title, skills, summary fragments) the prompt carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankDoc {
    pub candidate_id: String,
    pub rationale_input: String,
    /// Stage-1 fused score; the fallback ordering derives scores from it.
    pub hybrid_score: f64,
}

/// One scored item coming back from a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RerankedItem {
    pub candidate_id: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A single rerank backend (one model).
#[async_trait]
pub trait RerankProvider: Send + Sync {
    async fn rerank(
        &self,
        jd_text: &str,
        docs: &[RerankDoc],
    ) -> Result<Vec<RerankedItem>, RerankError>;

    /// Model version label, part of the rerank cache key.
    fn model_version(&self) -> &str;
}

/// LLM-backed reranker for one model.
pub struct LlmReranker {
    client: genai::Client,
    model: String,
}

impl LlmReranker {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: genai::Client::default(),
            model: model.into(),
        }
    }

    fn build_request(jd_text: &str, docs: &[RerankDoc]) -> ChatRequest {
        let system = "You are a candidate-ranking engine. Given a job description and a \
                      numbered candidate list, return ONLY a JSON array of \
                      {\"candidateId\": string, \"score\": number in [0,1], \"reason\": string} \
                      covering every candidate exactly once, best match first. No prose, no \
                      Markdown.";

        let mut user = String::with_capacity(jd_text.len() + docs.len() * 128);
        user.push_str("Job description:\n");
        user.push_str(jd_text);
        user.push_str("\n\nCandidates:\n");
        for doc in docs {
            user.push_str(&format!("- {}: {}\n", doc.candidate_id, doc.rationale_input));
        }

        ChatRequest::new(vec![ChatMessage::system(system), ChatMessage::user(user)])
    }

    fn classify(error: &genai::Error) -> RerankError {
        let message = error.to_string();
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            RerankError::ProviderTimeout { timeout_ms: 0 }
        } else if lower.contains("429") || lower.contains("rate") {
            RerankError::ProviderRateLimited
        } else {
            RerankError::Upstream { message }
        }
    }
}

#[async_trait]
impl RerankProvider for LlmReranker {
    async fn rerank(
        &self,
        jd_text: &str,
        docs: &[RerankDoc],
    ) -> Result<Vec<RerankedItem>, RerankError> {
        let request = Self::build_request(jd_text, docs);
        let response = self
            .client
            .exec_chat(&self.model, request, None)
            .await
            .map_err(|e| Self::classify(&e))?;

        let completion = response.first_text().ok_or_else(|| RerankError::ParseFailure {
            reason: "completion contained no text".to_string(),
        })?;

        parse_rerank_response(completion)
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for LlmReranker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmReranker").field("model", &self.model).finish()
    }
}

/// Scripted provider for tests: scores the input order descending (or
/// reversed when asked), or fails on demand.
#[cfg(any(test, feature = "mock"))]
pub struct MockRerankProvider {
    model: String,
    fail_with: parking_lot::Mutex<Option<fn() -> RerankError>>,
    reverse: std::sync::atomic::AtomicBool,
    pub calls: std::sync::atomic::AtomicU32,
}

#[cfg(any(test, feature = "mock"))]
impl MockRerankProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            fail_with: parking_lot::Mutex::new(None),
            reverse: std::sync::atomic::AtomicBool::new(false),
            calls: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn fail_with(&self, factory: Option<fn() -> RerankError>) {
        *self.fail_with.lock() = factory;
    }

    /// Makes the mock invert the incoming order, to test reorder plumbing.
    pub fn set_reverse(&self, reverse: bool) {
        self.reverse
            .store(reverse, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "mock"))]
#[async_trait]
impl RerankProvider for MockRerankProvider {
    async fn rerank(
        &self,
        _jd_text: &str,
        docs: &[RerankDoc],
    ) -> Result<Vec<RerankedItem>, RerankError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(factory) = *self.fail_with.lock() {
            return Err(factory());
        }
        let n = docs.len().max(1) as f64;
        let mut ordered: Vec<&RerankDoc> = docs.iter().collect();
        if self.reverse.load(std::sync::atomic::Ordering::SeqCst) {
            ordered.reverse();
        }
        Ok(ordered
            .into_iter()
            .enumerate()
            .map(|(i, doc)| RerankedItem {
                candidate_id: doc.candidate_id.clone(),
                score: 1.0 - i as f64 / n,
                reason: Some(format!("mock rank {}", i + 1)),
            })
            .collect())
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}
