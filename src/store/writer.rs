// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence of the precomputed lookup store.
//!
//! Everything is written in one transaction: a failed or refused write
//! leaves an existing store untouched.

use rusqlite::{params, Connection, OpenFlags, Transaction};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use super::{
    corpus_fingerprint, embedding_to_blob, meta_keys, table_exists, EMOJI_TABLE, LOOKUP_TABLE,
    SCHEMA_VERSION,
};
use crate::corpus::{EmojiCorpus, EmojiKind, VocabularyWord};
use crate::embedding::EmbeddedSet;
use crate::errors::{Error, Result};
use crate::ranking::{Metric, Ranking};

/// How an existing store is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace an existing `lookup` table instead of refusing.
    pub overwrite: bool,
    /// Refuse whenever `emoji_df` already holds rows, even with `overwrite`.
    pub strict_metadata: bool,
}

/// Everything one pipeline run persists.
pub struct StoreInput<'a> {
    pub ranking: &'a Ranking,
    pub vocab: &'a [VocabularyWord],
    pub emoji_vectors: &'a EmbeddedSet,
    pub corpus: &'a EmojiCorpus,
    pub model: &'a str,
    pub metric: Metric,
}

/// Row counts of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub lookup_rows: usize,
    pub emoji_rows: usize,
    pub vocab_rows: usize,
    pub vector_rows: usize,
}

/// Checks whether a store at `path` would accept a write with `options`,
/// without creating or modifying anything.
///
/// Lets a run fail on a refused store before spending time on embedding.
/// The write itself repeats the check inside its transaction.
pub fn preflight<P: AsRef<Path>>(path: P, options: WriteOptions) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        return Ok(());
    }

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
    check_existing(&conn, path, options)
}

/// Writer for the SQLite lookup store.
pub struct LookupWriter {
    conn: Connection,
    path: PathBuf,
}

impl LookupWriter {
    /// Opens or creates the store file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        Ok(Self { conn, path })
    }

    /// Returns the path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists one pipeline run.
    ///
    /// Fails with [`Error::Persistence`] when the store already has a
    /// `lookup` table and `overwrite` is off, or when `strict_metadata` is on
    /// and `emoji_df` already has rows.
    pub fn write(&mut self, input: &StoreInput<'_>, options: WriteOptions) -> Result<WriteSummary> {
        if input.ranking.rows() != input.vocab.len() {
            return Err(Error::Encoding(format!(
                "ranking has {} rows for {} vocabulary words",
                input.ranking.rows(),
                input.vocab.len()
            )));
        }

        let tx = self.conn.transaction()?;
        check_existing(&tx, &self.path, options)?;

        tx.execute_batch(
            r#"
            DROP TABLE IF EXISTS lookup;
            DROP TABLE IF EXISTS emoji_df;
            DROP TABLE IF EXISTS vocab;
            DROP TABLE IF EXISTS emoji_vectors;
            DROP TABLE IF EXISTS meta;

            CREATE TABLE lookup (
                rank_of_search INTEGER NOT NULL,
                word TEXT NOT NULL,
                word_lookup TEXT NOT NULL,
                similarity REAL NOT NULL
            );

            CREATE TABLE emoji_df (
                label TEXT NOT NULL UNIQUE,
                emoji TEXT NOT NULL,
                text TEXT NOT NULL,
                base_label TEXT NOT NULL,
                is_variant INTEGER NOT NULL,
                skin_tone TEXT,
                gender TEXT
            );

            CREATE TABLE vocab (
                idx INTEGER PRIMARY KEY,
                word TEXT NOT NULL
            );

            CREATE TABLE emoji_vectors (
                position INTEGER PRIMARY KEY,
                label TEXT NOT NULL,
                embedding BLOB NOT NULL
            );

            CREATE TABLE meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        let emoji_rows = insert_emoji(&tx, input.corpus)?;
        let vocab_rows = insert_vocab(&tx, input.vocab)?;
        let vector_rows = insert_vectors(&tx, input.emoji_vectors)?;
        let lookup_rows = insert_lookup(&tx, input)?;

        tx.execute_batch(
            r#"
            CREATE INDEX idx_lookup_word_rank ON lookup(word, rank_of_search);
            CREATE INDEX idx_emoji_df_base ON emoji_df(base_label);
            "#,
        )?;

        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let meta = [
            (meta_keys::SCHEMA_VERSION, SCHEMA_VERSION.to_string()),
            (meta_keys::MODEL, input.model.to_string()),
            (meta_keys::METRIC, input.metric.to_string()),
            (meta_keys::TOP_K, input.ranking.k().to_string()),
            (meta_keys::DIMENSION, input.emoji_vectors.dimension().to_string()),
            (meta_keys::EMOJI_COUNT, emoji_rows.to_string()),
            (meta_keys::BASE_EMOJI_COUNT, vector_rows.to_string()),
            (meta_keys::VOCAB_COUNT, vocab_rows.to_string()),
            (
                meta_keys::CORPUS_FINGERPRINT,
                corpus_fingerprint(input.corpus, input.vocab),
            ),
            (meta_keys::CREATED_AT, created_at.to_string()),
        ];
        {
            let mut stmt = tx.prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")?;
            for (key, value) in &meta {
                stmt.execute(params![key, value])?;
            }
        }

        tx.commit()?;

        let summary = WriteSummary {
            lookup_rows,
            emoji_rows,
            vocab_rows,
            vector_rows,
        };
        info!(
            path = %self.path.display(),
            lookup = lookup_rows,
            emoji = emoji_rows,
            vocab = vocab_rows,
            "Wrote lookup store"
        );
        Ok(summary)
    }

    /// Closes the writer connection explicitly.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e)?;
        Ok(())
    }
}

fn check_existing(conn: &Connection, path: &Path, options: WriteOptions) -> Result<()> {
    if table_exists(conn, LOOKUP_TABLE)? && !options.overwrite {
        return Err(Error::Persistence(format!(
            "{} already contains a lookup table; request overwrite to replace it",
            path.display()
        )));
    }

    if options.strict_metadata && table_exists(conn, EMOJI_TABLE)? {
        let rows: i64 = conn.query_row("SELECT COUNT(*) FROM emoji_df", [], |row| row.get(0))?;
        if rows > 0 {
            return Err(Error::Persistence(format!(
                "{} already contains {} emoji metadata rows (strict metadata mode)",
                path.display(),
                rows
            )));
        }
    }

    Ok(())
}

fn insert_emoji(tx: &Transaction<'_>, corpus: &EmojiCorpus) -> Result<usize> {
    let mut stmt = tx.prepare(
        r#"
        INSERT INTO emoji_df (label, emoji, text, base_label, is_variant, skin_tone, gender)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )?;

    for record in corpus.records() {
        let (skin_tone, gender) = match &record.kind {
            EmojiKind::Base => (None, None),
            EmojiKind::Variant {
                skin_tones, gender, ..
            } => {
                let tones = (!skin_tones.is_empty()).then(|| {
                    skin_tones
                        .iter()
                        .map(|t| t.as_str())
                        .collect::<Vec<_>>()
                        .join(",")
                });
                (tones, gender.map(|g| g.as_str()))
            }
        };

        stmt.execute(params![
            record.label,
            record.emoji,
            record.text,
            record.base_label(),
            record.is_variant(),
            skin_tone,
            gender,
        ])?;
    }

    Ok(corpus.len())
}

fn insert_vocab(tx: &Transaction<'_>, vocab: &[VocabularyWord]) -> Result<usize> {
    let mut stmt = tx.prepare("INSERT INTO vocab (idx, word) VALUES (?1, ?2)")?;
    for word in vocab {
        stmt.execute(params![word.idx as i64, word.word])?;
    }
    Ok(vocab.len())
}

fn insert_vectors(tx: &Transaction<'_>, vectors: &EmbeddedSet) -> Result<usize> {
    let mut stmt =
        tx.prepare("INSERT INTO emoji_vectors (position, label, embedding) VALUES (?1, ?2, ?3)")?;
    for (row, vector) in vectors.matrix.rows().into_iter().enumerate() {
        let label = vectors
            .id_map
            .id(row)
            .ok_or_else(|| Error::Encoding(format!("emoji row {} has no label", row)))?;
        let blob = embedding_to_blob(&vector.to_vec());
        stmt.execute(params![row as i64, label, blob])?;
    }
    Ok(vectors.len())
}

/// Writes one row per (word, rank), translating emoji matrix rows to labels.
fn insert_lookup(tx: &Transaction<'_>, input: &StoreInput<'_>) -> Result<usize> {
    let mut stmt = tx.prepare(
        "INSERT INTO lookup (rank_of_search, word, word_lookup, similarity) VALUES (?1, ?2, ?3, ?4)",
    )?;

    let id_map = &input.emoji_vectors.id_map;
    let mut rows = 0usize;
    for (i, word) in input.vocab.iter().enumerate() {
        for (rank, (emoji_row, score)) in input.ranking.row(i).enumerate() {
            let label = id_map.id(emoji_row).ok_or_else(|| {
                Error::Encoding(format!(
                    "ranking references emoji row {} but only {} emoji were embedded",
                    emoji_row,
                    id_map.len()
                ))
            })?;
            stmt.execute(params![rank as i64, word.word, label, score as f64])?;
            rows += 1;
        }
    }

    debug!(rows, "Inserted lookup rows");
    Ok(rows)
}
