//! Text→vector providers.
//!
//! Pluggable behind [`EmbeddingProvider`]: two hosted providers (primary and
//! secondary, same wire shape, different endpoints/models) and a
//! deterministic local provider for development. Production resolution goes
//! through [`ResilientEmbedder`], which adds retries, per-provider circuit
//! breakers and the primary→secondary fallback chain.

pub mod error;
pub mod local;
pub mod provider;
pub mod remote;
pub mod resilient;

pub use error::EmbeddingError;
pub use local::LocalEmbedder;
pub use provider::{Embedding, EmbeddingProvider, l2_normalize};
pub use remote::{RemoteEmbedder, RemoteEmbedderConfig};
pub use resilient::ResilientEmbedder;

/// Trims and length-caps embedding input. Empty input is invalid: callers
/// must be able to distinguish "no text" from "neutral vector".
pub(crate) fn prepare_text(text: &str, max_chars: usize) -> Result<String, EmbeddingError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EmbeddingError::InvalidInput {
            reason: "embedding input is empty".to_string(),
        });
    }
    if trimmed.chars().count() > max_chars {
        Ok(trimmed.chars().take(max_chars).collect())
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepare_text_trims() {
        assert_eq!(prepare_text("  hi  ", 100).unwrap(), "hi");
    }

    #[test]
    fn prepare_text_caps_length() {
        let long = "x".repeat(50);
        assert_eq!(prepare_text(&long, 10).unwrap().len(), 10);
    }

    #[test]
    fn prepare_text_rejects_empty() {
        assert!(matches!(
            prepare_text("   \n", 100),
            Err(EmbeddingError::InvalidInput { .. })
        ));
    }
}
