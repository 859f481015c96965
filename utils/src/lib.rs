//! # Cake Responder Utilities
//!
//! Hashing for cache keys, sanitization of model output, prompt truncation
//! and id generation.

use regex::Regex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Compute SHA-256 hash of content string
///
/// # Examples
///
/// ```
/// use utils::compute_content_hash;
///
/// let hash = compute_content_hash("hello world");
/// assert_eq!(hash.len(), 64);
/// ```
#[must_use]
pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate UUID v4 string
#[must_use]
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Truncates to at most `max_chars` characters, never splitting a code
/// point.
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Strips markup from model completions before they reach a client.
///
/// Script and style blocks are removed with their bodies; any other tag is
/// removed and its inner text kept.
#[derive(Debug, Clone)]
pub struct TextSanitizer {
    block_patterns: Vec<Regex>,
    tag_pattern: Option<Regex>,
}

impl Default for TextSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSanitizer {
    pub fn new() -> Self {
        let block_patterns = [
            r"(?is)<script\b[^>]*>.*?</script\s*>",
            r"(?is)<style\b[^>]*>.*?</style\s*>",
            r"(?i)<script\b[^>]*>",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect();

        Self {
            block_patterns,
            tag_pattern: Regex::new(r"</?[A-Za-z][^<>]*>").ok(),
        }
    }

    #[must_use]
    pub fn sanitize(&self, text: &str) -> String {
        let mut result = text.to_string();
        for pattern in &self.block_patterns {
            result = pattern.replace_all(&result, "").into_owned();
        }
        if let Some(tag) = &self.tag_pattern {
            result = tag.replace_all(&result, "").into_owned();
        }
        result.trim().to_string()
    }
}
