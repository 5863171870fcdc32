// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime lookup over a precomputed store.
//!
//! The store is opened read-only. A handle is not shared between threads;
//! concurrent readers each open their own [`EmojiIndex`].

use ndarray::Array2;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{blob_to_embedding, meta_keys, table_exists, EMOJI_TABLE, LOOKUP_TABLE};
use crate::corpus::{normalize_word, Gender, SkinTone};
use crate::embedding::{canonical_model_name, EmbeddedSet, EmbeddingProvider};
use crate::errors::{Error, Result};
use crate::ranking::{rank, Metric};

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmojiHit {
    pub label: String,
    pub text: String,
    pub emoji: String,
    pub rank: usize,
    pub similarity: f32,
}

/// One row of the `emoji_df` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiEntry {
    pub label: String,
    pub emoji: String,
    pub text: String,
    pub base_label: String,
    pub is_variant: bool,
    pub skin_tone: Option<String>,
    pub gender: Option<String>,
}

/// Read-only handle on a lookup store.
pub struct EmojiIndex {
    conn: Connection,
    path: PathBuf,
}

const ENTRY_COLUMNS: &str = "label, emoji, text, base_label, is_variant, skin_tone, gender";

impl EmojiIndex {
    /// Opens the store at `path` read-only.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("lookup store not found: {}", path.display()),
            )));
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;

        for table in [LOOKUP_TABLE, EMOJI_TABLE] {
            if !table_exists(&conn, table)? {
                return Err(Error::Persistence(format!(
                    "{} is not a lookup store (missing table '{}')",
                    path.display(),
                    table
                )));
            }
        }

        Ok(Self { conn, path })
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ranked emoji for a vocabulary word, best first.
    ///
    /// The query is trimmed and lowercased. Words outside the precomputed
    /// vocabulary give an empty result; there is no fuzzy fallback.
    pub fn top_emojis(&self, query: &str) -> Result<Vec<EmojiHit>> {
        let word = normalize_word(query);
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT l.word_lookup, e.text, e.emoji, l.rank_of_search, l.similarity
            FROM lookup l
            JOIN emoji_df e ON e.label = l.word_lookup
            WHERE l.word = ?1
            ORDER BY l.rank_of_search
            "#,
        )?;

        let hits = stmt
            .query_map(params![word], |row| {
                let rank: i64 = row.get(3)?;
                let similarity: f64 = row.get(4)?;
                Ok(EmojiHit {
                    label: row.get(0)?,
                    text: row.get(1)?,
                    emoji: row.get(2)?,
                    rank: rank as usize,
                    similarity: similarity as f32,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(query = %word, hits = hits.len(), "Lookup");
        Ok(hits)
    }

    /// Whether `word` is part of the precomputed vocabulary.
    pub fn contains_word(&self, word: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM lookup WHERE word = ?1 LIMIT 1",
                params![normalize_word(word)],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Variant labels (skin tone and gender) of a base emoji, in corpus order.
    ///
    /// Labels without variants, variant labels and unknown labels give an
    /// empty list.
    pub fn add_variants(&self, base_label: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT label FROM emoji_df WHERE base_label = ?1 AND is_variant = 1 ORDER BY rowid",
        )?;
        let labels = stmt
            .query_map(params![base_label], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(labels)
    }

    /// The base a label resolves to: itself for base emoji, `None` when the
    /// label is unknown.
    pub fn base_label(&self, label: &str) -> Result<Option<String>> {
        let base = self
            .conn
            .query_row(
                "SELECT base_label FROM emoji_df WHERE label = ?1",
                params![label],
                |row| row.get(0),
            )
            .optional()?;
        Ok(base)
    }

    /// Full metadata of one emoji.
    pub fn emoji(&self, label: &str) -> Result<Option<EmojiEntry>> {
        let sql = format!("SELECT {} FROM emoji_df WHERE label = ?1", ENTRY_COLUMNS);
        let entry = self
            .conn
            .query_row(&sql, params![label], entry_from_row)
            .optional()?;
        Ok(entry)
    }

    /// Picks the variant of `base_label` to display for a skin tone and
    /// gender preference.
    ///
    /// Variants whose label ends with the tone token are preferred; among
    /// those (or among all variants when none matches the tone) the gender
    /// narrows further. The first remaining variant wins, otherwise the base
    /// itself. The token must follow an underscore, so `dark` never picks a
    /// `medium-dark` variant.
    pub fn preferred_variant(
        &self,
        base_label: &str,
        skin_tone: Option<SkinTone>,
        gender: Option<Gender>,
    ) -> Result<Option<EmojiEntry>> {
        let Some(base) = self.emoji(base_label)? else {
            return Ok(None);
        };

        let sql = format!(
            "SELECT {} FROM emoji_df WHERE base_label = ?1 AND is_variant = 1 ORDER BY rowid",
            ENTRY_COLUMNS
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let variants = stmt
            .query_map(params![base_label], entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut preferred: Vec<&EmojiEntry> = match skin_tone {
            Some(tone) => {
                let suffix = format!("_{}:", tone.token());
                variants.iter().filter(|v| v.label.ends_with(&suffix)).collect()
            }
            None => Vec::new(),
        };

        if let Some(gender) = gender {
            let prefix = gender.prefix();
            let pool: Vec<&EmojiEntry> = if preferred.is_empty() {
                variants.iter().collect()
            } else {
                preferred.clone()
            };
            let gendered: Vec<&EmojiEntry> = pool
                .into_iter()
                .filter(|v| v.label.starts_with(&prefix))
                .collect();
            if !gendered.is_empty() {
                preferred = gendered;
            }
        }

        Ok(Some(preferred.first().map(|v| (*v).clone()).unwrap_or(base)))
    }

    /// Ranks the stored emoji vectors against a freshly embedded query.
    ///
    /// Works for any query, at the cost of running `provider`, which must be
    /// the model the store was built with. Model names are compared in
    /// canonical form, so aliases of the stored model are accepted.
    pub fn live_search(
        &self,
        provider: &mut dyn EmbeddingProvider,
        query: &str,
        k: usize,
        metric: Metric,
    ) -> Result<Vec<EmojiHit>> {
        if let Some(model) = self.meta_value(meta_keys::MODEL)? {
            if canonical_model_name(&model) != canonical_model_name(provider.model_id()) {
                return Err(Error::model_load(
                    provider.model_id(),
                    format!("store was built with model '{}'", model),
                ));
            }
        }

        let vectors = self.emoji_vectors()?;
        let query_vector = provider.embed_one(&normalize_word(query))?;
        let dim = query_vector.len();
        let query_matrix = Array2::from_shape_vec((1, dim), query_vector)
            .map_err(|e| Error::Encoding(e.to_string()))?;

        let ranking = rank(&query_matrix, &vectors.matrix, k, metric)?;
        let mut hits = Vec::with_capacity(ranking.k());
        for (rank, (row, similarity)) in ranking.row(0).enumerate() {
            let Some(label) = vectors.id_map.id(row) else {
                continue;
            };
            if let Some(entry) = self.emoji(label)? {
                hits.push(EmojiHit {
                    label: entry.label,
                    text: entry.text,
                    emoji: entry.emoji,
                    rank,
                    similarity,
                });
            }
        }
        Ok(hits)
    }

    /// Loads the persisted base emoji vectors in matrix order.
    pub fn emoji_vectors(&self) -> Result<EmbeddedSet> {
        let mut stmt = self
            .conn
            .prepare("SELECT label, embedding FROM emoji_vectors ORDER BY position")?;
        let rows = stmt
            .query_map([], |row| {
                let label: String = row.get(0)?;
                let blob: Vec<u8> = row.get(1)?;
                Ok((label, blob_to_embedding(&blob)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (labels, vectors): (Vec<String>, Vec<Vec<f32>>) = rows.into_iter().unzip();
        EmbeddedSet::from_rows(labels, vectors)
    }

    /// Gets metadata value by key.
    pub fn meta_value(&self, key: &str) -> Result<Option<String>> {
        if !table_exists(&self.conn, "meta")? {
            return Ok(None);
        }
        let value = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// All metadata entries, sorted by key.
    pub fn meta(&self) -> Result<Vec<(String, String)>> {
        if !table_exists(&self.conn, "meta")? {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare("SELECT key, value FROM meta ORDER BY key")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Number of precomputed vocabulary words.
    pub fn vocabulary_size(&self) -> Result<u64> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT word) FROM lookup", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<EmojiEntry> {
    Ok(EmojiEntry {
        label: row.get(0)?,
        emoji: row.get(1)?,
        text: row.get(2)?,
        base_label: row.get(3)?,
        is_variant: row.get(4)?,
        skin_tone: row.get(5)?,
        gender: row.get(6)?,
    })
}
