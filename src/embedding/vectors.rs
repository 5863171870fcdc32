// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector building for the emoji corpus and the vocabulary.
//!
//! Each built matrix carries an [`IdMap`] translating row positions back to
//! the label or word they embed. Rankings are positional; the map is the only
//! way back to stable identifiers.

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView1};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use super::provider::EmbeddingProvider;
use crate::corpus::{EmojiCorpus, VocabularyWord};
use crate::errors::{Error, Result};

/// Row index <-> identifier mapping for an embedding matrix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdMap {
    ids: Vec<String>,
    rows: HashMap<String, usize>,
}

impl IdMap {
    pub fn new(ids: Vec<String>) -> Self {
        let mut rows = HashMap::with_capacity(ids.len());
        for (row, id) in ids.iter().enumerate() {
            rows.entry(id.clone()).or_insert(row);
        }
        Self { ids, rows }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Identifier of matrix row `row`.
    pub fn id(&self, row: usize) -> Option<&str> {
        self.ids.get(row).map(String::as_str)
    }

    /// Matrix row of `id`.
    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.rows.get(id).copied()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

/// An embedding matrix (one row per entity) and its id map.
#[derive(Debug, Clone)]
pub struct EmbeddedSet {
    pub matrix: Array2<f32>,
    pub id_map: IdMap,
}

impl EmbeddedSet {
    /// Assembles a set from per-row vectors, checking that every row has the
    /// same dimension.
    pub fn from_rows(ids: Vec<String>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if ids.len() != vectors.len() {
            return Err(Error::Encoding(format!(
                "{} identifiers for {} vectors",
                ids.len(),
                vectors.len()
            )));
        }
        let matrix = stack_rows(vectors)?;
        Ok(Self {
            matrix,
            id_map: IdMap::new(ids),
        })
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.matrix.ncols()
    }

    /// Vector of the entity identified by `id`.
    pub fn vector(&self, id: &str) -> Option<ArrayView1<'_, f32>> {
        self.id_map.row_of(id).map(|row| self.matrix.row(row))
    }
}

/// Embeds every base emoji description. Row `i` is the `i`-th base record in
/// corpus order; variants are never embedded.
pub fn build_emoji_vectors(
    provider: &mut dyn EmbeddingProvider,
    corpus: &EmojiCorpus,
) -> Result<EmbeddedSet> {
    let (labels, texts): (Vec<String>, Vec<String>) = corpus
        .base_records()
        .map(|r| (r.label.clone(), r.text.clone()))
        .unzip();

    let vectors = embed_all(provider, &texts, "emoji")?;
    EmbeddedSet::from_rows(labels, vectors)
}

/// Embeds every vocabulary word. Row `i` is the word with `idx == i`.
pub fn build_vocab_vectors(
    provider: &mut dyn EmbeddingProvider,
    words: &[VocabularyWord],
) -> Result<EmbeddedSet> {
    let texts: Vec<String> = words.iter().map(|w| w.word.clone()).collect();
    let vectors = embed_all(provider, &texts, "words")?;
    EmbeddedSet::from_rows(texts, vectors)
}

/// Embeds `texts` in provider-sized batches. Any short or failed batch
/// aborts; rows are never dropped.
pub fn embed_all(
    provider: &mut dyn EmbeddingProvider,
    texts: &[String],
    what: &str,
) -> Result<Vec<Vec<f32>>> {
    let started = Instant::now();
    let batch_size = provider.batch_size().max(1);
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .expect("valid progress bar template")
            .progress_chars("##."),
    );
    pb.set_message(format!("Embedding {}", what));

    for (batch_idx, batch) in texts.chunks(batch_size).enumerate() {
        let embedded = match provider.embed_texts(batch) {
            Ok(embedded) => embedded,
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        };
        if embedded.len() != batch.len() {
            pb.abandon();
            return Err(Error::Encoding(format!(
                "batch {} of {}: provider returned {} vectors for {} texts",
                batch_idx,
                what,
                embedded.len(),
                batch.len()
            )));
        }
        debug!(batch = batch_idx, size = batch.len(), what, "Embedded batch");
        pb.inc(batch.len() as u64);
        vectors.extend(embedded);
    }

    pb.finish_and_clear();
    info!(
        what,
        count = vectors.len(),
        model = provider.model_id(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Built vectors"
    );
    Ok(vectors)
}

fn stack_rows(vectors: Vec<Vec<f32>>) -> Result<Array2<f32>> {
    let Some(first) = vectors.first() else {
        return Ok(Array2::zeros((0, 0)));
    };
    let dim = first.len();
    let rows = vectors.len();

    let mut flat = Vec::with_capacity(rows * dim);
    for (row, vector) in vectors.into_iter().enumerate() {
        if vector.len() != dim {
            return Err(Error::Encoding(format!(
                "row {} has dimension {}, expected {}",
                row,
                vector.len(),
                dim
            )));
        }
        flat.extend(vector);
    }

    Array2::from_shape_vec((rows, dim), flat).map_err(|e| Error::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{vocabulary_from_lines, RawEmoji};
    use crate::embedding::DummyProvider;

    /// Embeds a text as its character count, so rows are recognizable.
    struct LengthProvider;

    impl EmbeddingProvider for LengthProvider {
        fn model_id(&self) -> &str {
            "length"
        }

        fn batch_size(&self) -> usize {
            2
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| vec![t.chars().count() as f32, 1.0])
                .collect())
        }
    }

    /// Drops the last text of every batch.
    struct LossyProvider;

    impl EmbeddingProvider for LossyProvider {
        fn model_id(&self) -> &str {
            "lossy"
        }

        fn batch_size(&self) -> usize {
            4
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0]).collect())
        }
    }

    /// Fails on the batch with index `fail_at`, counting calls.
    struct FailingProvider {
        fail_at: usize,
        calls: usize,
    }

    impl EmbeddingProvider for FailingProvider {
        fn model_id(&self) -> &str {
            "failing"
        }

        fn batch_size(&self) -> usize {
            1
        }

        fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls;
            self.calls += 1;
            if call == self.fail_at {
                return Err(Error::Encoding(format!("model crashed on '{}'", texts[0])));
            }
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    fn corpus() -> EmojiCorpus {
        EmojiCorpus::from_rows(vec![
            RawEmoji::new(":ok_hand:", "👌", "ok hand"),
            RawEmoji::new(":ok_hand_light_skin_tone:", "👌🏻", "ok hand: light skin tone"),
            RawEmoji::new(":ok_hand_medium_skin_tone:", "👌🏽", "ok hand: medium skin tone"),
            RawEmoji::new(":ok_hand_dark_skin_tone:", "👌🏿", "ok hand: dark skin tone"),
            RawEmoji::new(":cherry_blossom:", "🌸", "cherry blossom"),
            RawEmoji::new(":rock:", "🪨", "rock"),
        ])
        .unwrap()
    }

    #[test]
    fn emoji_rows_follow_base_order() {
        let set = build_emoji_vectors(&mut LengthProvider, &corpus()).unwrap();
        assert_eq!(
            set.id_map.ids(),
            &[":ok_hand:", ":cherry_blossom:", ":rock:"]
        );
        assert_eq!(set.matrix[[0, 0]], 7.0);
        assert_eq!(set.matrix[[1, 0]], 14.0);
        assert_eq!(set.matrix[[2, 0]], 4.0);
    }

    #[test]
    fn variants_get_no_rows() {
        let corpus = corpus();
        let set = build_emoji_vectors(&mut DummyProvider::new(8), &corpus).unwrap();
        let embedded: Vec<&str> = set.id_map.ids().iter().map(String::as_str).collect();
        let bases: Vec<&str> = corpus.base_records().map(|r| r.label.as_str()).collect();
        assert_eq!(embedded, bases);
        assert_eq!(set.len(), 3);
        assert_eq!(set.dimension(), 8);
    }

    #[test]
    fn id_map_translates_both_ways() {
        let map = IdMap::new(vec![":a:".to_string(), ":b:".to_string()]);
        assert_eq!(map.id(1), Some(":b:"));
        assert_eq!(map.row_of(":a:"), Some(0));
        assert_eq!(map.id(2), None);
        assert_eq!(map.row_of(":c:"), None);
    }

    #[test]
    fn empty_word_keeps_its_row() {
        let words = vocabulary_from_lines(["flower", "", "rock"], 10);
        let set = build_vocab_vectors(&mut LengthProvider, &words).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.id_map.id(1), Some(""));
        assert_eq!(set.matrix[[1, 0]], 0.0);
        assert_eq!(set.vector("rock").unwrap()[0], 4.0);
    }

    #[test]
    fn short_batch_aborts() {
        let words = vocabulary_from_lines(["a", "b", "c"], 10);
        let err = build_vocab_vectors(&mut LossyProvider, &words).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn provider_error_stops_embedding() {
        let words = vocabulary_from_lines(["a", "b", "c", "d"], 10);
        let mut provider = FailingProvider {
            fail_at: 1,
            calls: 0,
        };
        let err = build_vocab_vectors(&mut provider, &words).unwrap_err();
        match err {
            Error::Encoding(msg) => assert_eq!(msg, "model crashed on 'b'"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(provider.calls, 2);
    }

    #[test]
    fn inconsistent_dimension_is_rejected() {
        let err = EmbeddedSet::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn empty_input_gives_empty_matrix() {
        let set = build_vocab_vectors(&mut LengthProvider, &[]).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.matrix.dim(), (0, 0));
    }
}
