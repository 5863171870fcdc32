// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite lookup store.
//!
//! The offline pipeline writes it once through [`LookupWriter`]; the runtime
//! reads it through [`EmojiIndex`] without any embedding model.
//!
//! Tables (column names are the consumer contract):
//! - `lookup(rank_of_search, word, word_lookup, similarity)`
//! - `emoji_df(label, emoji, text, base_label, is_variant, skin_tone, gender)`
//! - `vocab(idx, word)`
//! - `emoji_vectors(position, label, embedding)`
//! - `meta(key, value)`

pub mod lookup;
pub mod writer;

pub use lookup::{EmojiEntry, EmojiHit, EmojiIndex};
pub use writer::{preflight, LookupWriter, StoreInput, WriteOptions, WriteSummary};

use crate::corpus::{EmojiCorpus, VocabularyWord};

/// Conventional file name of the store written by `precompute`.
pub const DEFAULT_STORE_FILE: &str = "main.db";

pub(crate) const LOOKUP_TABLE: &str = "lookup";
pub(crate) const EMOJI_TABLE: &str = "emoji_df";

/// Keys of the `meta` table.
pub mod meta_keys {
    pub const SCHEMA_VERSION: &str = "schema_version";
    pub const MODEL: &str = "model";
    pub const METRIC: &str = "metric";
    pub const TOP_K: &str = "top_k";
    pub const DIMENSION: &str = "dimension";
    pub const EMOJI_COUNT: &str = "emoji_count";
    pub const BASE_EMOJI_COUNT: &str = "base_emoji_count";
    pub const VOCAB_COUNT: &str = "vocab_count";
    pub const CORPUS_FINGERPRINT: &str = "corpus_fingerprint";
    pub const CREATED_AT: &str = "created_at";
}

pub(crate) const SCHEMA_VERSION: &str = "1";

/// Hash over everything that determines the lookup table besides the model:
/// every emoji row and every vocabulary word, in order.
pub fn corpus_fingerprint(corpus: &EmojiCorpus, vocab: &[VocabularyWord]) -> String {
    let mut hasher = blake3::Hasher::new();
    for record in corpus.records() {
        for field in [&record.label, &record.emoji, &record.text] {
            hasher.update(field.as_bytes());
            hasher.update(&[0x1f]);
        }
        hasher.update(b"\n");
    }
    hasher.update(&[0x1e]);
    for word in vocab {
        hasher.update(word.word.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Converts an embedding vector to a compact blob.
pub(crate) fn embedding_to_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Converts a blob back to an embedding vector.
pub(crate) fn blob_to_embedding(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect()
}

pub(crate) fn table_exists(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
