// SPDX-License-Identifier: MIT OR Apache-2.0

//! Search vocabulary loading.
//!
//! The word list is expected to be pre-sorted by usefulness (frequency or
//! curation). Truncation keeps the first `limit` distinct words in file order
//! and never re-sorts.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::{Error, Result};

/// A searchable word with its dense position in the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VocabularyWord {
    pub idx: usize,
    pub word: String,
}

/// Normalizes a word or query the way the lookup table stores it.
pub fn normalize_word(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Loads the first `limit` distinct words from a one-word-per-line file.
///
/// Blank lines are kept as the empty word. When a line has several
/// comma-separated fields only the first is used.
pub fn load_vocabulary<P: AsRef<Path>>(path: P, limit: usize) -> Result<Vec<VocabularyWord>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| Error::corpus(path, e))?;
    let content =
        String::from_utf8(bytes).map_err(|e| Error::corpus(path, format!("not valid UTF-8: {}", e)))?;

    let words = vocabulary_from_lines(content.lines(), limit);
    info!(
        path = %path.display(),
        words = words.len(),
        limit,
        "Loaded vocabulary"
    );
    Ok(words)
}

/// Builds the vocabulary from raw lines, deduplicating and truncating.
pub fn vocabulary_from_lines<I, S>(lines: I, limit: usize) -> Vec<VocabularyWord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut words = Vec::new();
    let mut duplicates = 0usize;

    for line in lines {
        if words.len() == limit {
            break;
        }
        let first_field = line.as_ref().split(',').next().unwrap_or_default();
        let word = normalize_word(first_field);
        if !seen.insert(word.clone()) {
            duplicates += 1;
            continue;
        }
        words.push(VocabularyWord {
            idx: words.len(),
            word,
        });
    }

    if duplicates > 0 {
        warn!(duplicates, "Dropped duplicate vocabulary entries");
    }

    words
}
