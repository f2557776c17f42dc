//! LLM-driven reordering of the top-K candidates (ranking Stage 3).
//!
//! The engine is deterministic from the outside: identical cache keys return
//! identical orderings, and any provider or parse failure degrades to the
//! incoming order (scores derived from hybrid score, `applied = false`)
//! rather than an error.

pub mod engine;
pub mod error;
pub mod parse;
pub mod provider;

pub use engine::{RerankEngine, RerankOutcome};
pub use error::RerankError;
pub use parse::parse_rerank_response;
#[cfg(any(test, feature = "mock"))]
pub use provider::MockRerankProvider;
pub use provider::{LlmReranker, RerankDoc, RerankProvider, RerankedItem};
