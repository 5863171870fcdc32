// SPDX-License-Identifier: MIT OR Apache-2.0

//! Emoji description corpus.
//!
//! The corpus is a CSV file with a header row naming at least the `label`,
//! `emoji` and `text` columns. Other columns (a leading pandas index, group
//! names, code points) are ignored.

use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use super::variant::{classify_labels, EmojiKind};
use crate::errors::{Error, Result};

/// One emoji of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmojiRecord {
    /// Unique key such as `:cherry_blossom:`
    pub label: String,
    /// Display glyph
    pub emoji: String,
    /// Human-readable description, the text that gets embedded
    pub text: String,
    pub kind: EmojiKind,
}

impl EmojiRecord {
    pub fn is_variant(&self) -> bool {
        self.kind.is_variant()
    }

    /// The base label this record resolves to (its own label for bases).
    pub fn base_label(&self) -> &str {
        match &self.kind {
            EmojiKind::Base => &self.label,
            EmojiKind::Variant { base, .. } => base,
        }
    }
}

/// Unclassified corpus row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEmoji {
    pub label: String,
    pub emoji: String,
    pub text: String,
}

impl RawEmoji {
    pub fn new(label: impl Into<String>, emoji: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            emoji: emoji.into(),
            text: text.into(),
        }
    }
}

/// The classified emoji corpus in file order.
#[derive(Debug, Clone)]
pub struct EmojiCorpus {
    records: Vec<EmojiRecord>,
    by_label: HashMap<String, usize>,
}

impl EmojiCorpus {
    /// Loads and classifies the corpus at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let rows = read_rows(path)?;
        let corpus = Self::build(rows).map_err(|reason| Error::corpus(path, reason))?;

        info!(
            path = %path.display(),
            records = corpus.len(),
            bases = corpus.base_count(),
            "Loaded emoji corpus"
        );
        Ok(corpus)
    }

    /// Builds a corpus from in-memory rows.
    pub fn from_rows<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = RawEmoji>,
    {
        Self::build(rows.into_iter().collect()).map_err(|reason| Error::corpus("<memory>", reason))
    }

    fn build(rows: Vec<RawEmoji>) -> std::result::Result<Self, String> {
        let mut by_label = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.label.trim().is_empty() {
                return Err(format!("row {} has an empty label", i + 1));
            }
            if by_label.insert(row.label.clone(), i).is_some() {
                return Err(format!("duplicate label '{}'", row.label));
            }
        }

        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        let kinds = classify_labels(&labels);

        let records: Vec<EmojiRecord> = rows
            .into_iter()
            .zip(kinds)
            .map(|(row, kind)| EmojiRecord {
                label: row.label,
                emoji: row.emoji,
                text: row.text,
                kind,
            })
            .collect();

        let orphans = records
            .iter()
            .filter(|r| r.is_variant() && !by_label.contains_key(r.base_label()))
            .count();
        if orphans > 0 {
            warn!(orphans, "Variants whose base emoji is not in the corpus");
        }

        Ok(Self { records, by_label })
    }

    pub fn records(&self) -> &[EmojiRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<&EmojiRecord> {
        self.by_label.get(label).map(|&i| &self.records[i])
    }

    /// Base (non-variant) records in corpus order. Only these get embedded.
    pub fn base_records(&self) -> impl Iterator<Item = &EmojiRecord> {
        self.records.iter().filter(|r| !r.is_variant())
    }

    pub fn base_count(&self) -> usize {
        self.base_records().count()
    }
}

fn read_rows(path: &Path) -> Result<Vec<RawEmoji>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| Error::corpus(path, e))?;

    let headers = reader.headers().map_err(|e| Error::corpus(path, e))?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::corpus(path, format!("missing column '{}'", name)))
    };
    let label_col = column("label")?;
    let emoji_col = column("emoji")?;
    let text_col = column("text")?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::corpus(path, format!("row {}: {}", i + 1, e)))?;
        let field = |col: usize| record.get(col).unwrap_or_default().to_string();
        rows.push(RawEmoji {
            label: field(label_col).trim().to_string(),
            emoji: field(emoji_col),
            text: field(text_col),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::variant::SkinTone;
    use std::fs;
    use tempfile::tempdir;

    fn sample_rows() -> Vec<RawEmoji> {
        vec![
            RawEmoji::new(":waving_hand:", "👋", "waving hand"),
            RawEmoji::new(":waving_hand_light_skin_tone:", "👋🏻", "waving hand: light skin tone"),
            RawEmoji::new(":waving_hand_medium_skin_tone:", "👋🏽", "waving hand: medium skin tone"),
            RawEmoji::new(":waving_hand_dark_skin_tone:", "👋🏿", "waving hand: dark skin tone"),
            RawEmoji::new(":cherry_blossom:", "🌸", "cherry blossom"),
        ]
    }

    #[test]
    fn base_records_exclude_variants() {
        let corpus = EmojiCorpus::from_rows(sample_rows()).unwrap();
        let bases: Vec<&str> = corpus.base_records().map(|r| r.label.as_str()).collect();
        assert_eq!(bases, vec![":waving_hand:", ":cherry_blossom:"]);
        assert_eq!(corpus.base_count(), 2);
    }

    #[test]
    fn variants_resolve_to_their_base() {
        let corpus = EmojiCorpus::from_rows(sample_rows()).unwrap();
        let variants: Vec<&str> = corpus
            .records()
            .iter()
            .filter(|r| r.is_variant() && r.base_label() == ":waving_hand:")
            .map(|r| r.label.as_str())
            .collect();
        assert_eq!(
            variants,
            vec![
                ":waving_hand_light_skin_tone:",
                ":waving_hand_medium_skin_tone:",
                ":waving_hand_dark_skin_tone:",
            ]
        );
        assert_eq!(
            corpus.get(":waving_hand_dark_skin_tone:").map(|r| r.base_label()),
            Some(":waving_hand:")
        );
        assert!(corpus
            .records()
            .iter()
            .all(|r| r.base_label() != ":cherry_blossom:" || !r.is_variant()));

        match &corpus.get(":waving_hand_light_skin_tone:").unwrap().kind {
            EmojiKind::Variant { skin_tones, .. } => assert_eq!(skin_tones, &[SkinTone::Light]),
            other => panic!("expected variant, got {:?}", other),
        }
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let rows = vec![
            RawEmoji::new(":rock:", "🪨", "rock"),
            RawEmoji::new(":rock:", "🪨", "rock again"),
        ];
        let err = EmojiCorpus::from_rows(rows).unwrap_err();
        assert!(matches!(err, Error::CorpusFormat { .. }));
    }

    #[test]
    fn loads_csv_with_extra_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emoji_df.csv");
        fs::write(
            &path,
            ",emoji,label,text,group\n0,🌸,:cherry_blossom:,cherry blossom,Animals & Nature\n1,🔧,:wrench:,\"wrench, tool\",Objects\n",
        )
        .unwrap();

        let corpus = EmojiCorpus::load(&path).unwrap();
        assert_eq!(corpus.len(), 2);
        let wrench = corpus.get(":wrench:").unwrap();
        assert_eq!(wrench.emoji, "🔧");
        assert_eq!(wrench.text, "wrench, tool");
    }

    #[test]
    fn missing_column_is_a_format_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emoji_df.csv");
        fs::write(&path, "label,emoji\n:rock:,🪨\n").unwrap();

        let err = EmojiCorpus::load(&path).unwrap_err();
        assert!(err.to_string().contains("missing column 'text'"));
    }

    #[test]
    fn missing_file_is_a_format_error() {
        let dir = tempdir().unwrap();
        let err = EmojiCorpus::load(dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::CorpusFormat { .. }));
    }
}
