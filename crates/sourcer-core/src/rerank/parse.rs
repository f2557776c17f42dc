//! Strict-then-lenient parsing of LLM rerank completions.
//!
//! Strict: the entire completion is a JSON array of scored items. Lenient:
//! strip Markdown code fences, then take the first balanced `[`…`]` slice.
//! Anything beyond that is a [`RerankError::ParseFailure`] — there is no
//! third pass, and a parse failure never writes the cache.

use super::error::RerankError;
use super::provider::RerankedItem;

/// Parses a completion into scored items, strict first, lenient second.
pub fn parse_rerank_response(completion: &str) -> Result<Vec<RerankedItem>, RerankError> {
    let trimmed = completion.trim();

    if let Ok(items) = serde_json::from_str::<Vec<RerankedItem>>(trimmed) {
        return Ok(items);
    }

    let without_fences = strip_code_fences(trimmed);
    let slice = balanced_array_slice(&without_fences).ok_or_else(|| RerankError::ParseFailure {
        reason: "no JSON array found in completion".to_string(),
    })?;

    serde_json::from_str::<Vec<RerankedItem>>(slice).map_err(|e| RerankError::ParseFailure {
        reason: e.to_string(),
    })
}

/// Drops ```-fenced wrapper lines, keeping the fence body.
fn strip_code_fences(text: &str) -> String {
    if !text.contains("```") {
        return text.to_string();
    }
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Finds the first top-level balanced `[`…`]` slice, respecting strings.
fn balanced_array_slice(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}
