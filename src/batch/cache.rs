use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::resolution::{Citation, ResolutionResult, ResolutionStatus};

/// Lowercase, drop punctuation and collapse whitespace
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Deterministic key for a citation: SHA-256 over normalized title, authors and year.
///
/// Journal and raw text are left out so formatting differences of the same
/// reference share one entry.
pub fn cache_key(citation: &Citation) -> String {
    let authors: Vec<String> = citation.authors.iter().map(|a| normalize_text(a)).collect();
    let year = citation.year.map(|y| y.to_string()).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(normalize_text(&citation.title).as_bytes());
    hasher.update([0x1f]);
    hasher.update(authors.join(";").as_bytes());
    hasher.update([0x1f]);
    hasher.update(year.as_bytes());
    hex::encode(hasher.finalize())
}

/// Results keyed by [`cache_key`], owned by a single processor.
///
/// Failed results are never stored so that transient errors get retried.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    entries: HashMap<String, ResolutionResult>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ResolutionResult> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Store a result; returns false when the result is not cacheable
    pub fn insert(&mut self, key: String, result: ResolutionResult) -> bool {
        if result.status == ResolutionStatus::Failed {
            return false;
        }
        self.entries.insert(key, result);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
