// SPDX-License-Identifier: MIT OR Apache-2.0

//! Similarity ranking between vocabulary vectors and emoji vectors.
//!
//! The full similarity matrix is computed as dense block matrix products
//! (vocabulary rows in blocks, blocks in parallel), then each row keeps its
//! top-k emoji by descending similarity. Ties are broken by ascending emoji
//! row, so the output is deterministic.

use ndarray::{s, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;
use tracing::info;

use crate::errors::{Error, Result};

/// Default number of emoji kept per vocabulary word.
pub const DEFAULT_TOP_K: usize = 25;

/// Vocabulary rows per matrix product.
const ROW_BLOCK: usize = 1024;

/// Similarity metric used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Dot product of L2-normalized vectors
    #[default]
    #[serde(alias = "cos")]
    Cosine,
    /// Raw dot product
    Dot,
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Cosine => write!(f, "cos"),
            Metric::Dot => write!(f, "dot"),
        }
    }
}

impl std::str::FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cos" | "cosine" => Ok(Metric::Cosine),
            "dot" => Ok(Metric::Dot),
            _ => Err(format!("Unknown similarity metric: {}", s)),
        }
    }
}

/// Top-k emoji rows per vocabulary row.
///
/// `indices[[i, j]]` is the emoji matrix row of the `j`-th most similar emoji
/// to vocabulary row `i`; `scores[[i, j]]` is its similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub indices: Array2<usize>,
    pub scores: Array2<f32>,
}

impl Ranking {
    fn empty(rows: usize) -> Self {
        Self {
            indices: Array2::zeros((rows, 0)),
            scores: Array2::zeros((rows, 0)),
        }
    }

    /// Number of ranked vocabulary rows.
    pub fn rows(&self) -> usize {
        self.indices.nrows()
    }

    /// Number of ranks per row: `min(k, emoji_count)`.
    pub fn k(&self) -> usize {
        self.indices.ncols()
    }

    /// `(emoji_row, score)` pairs of one vocabulary row, best first.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.indices
            .row(row)
            .into_iter()
            .copied()
            .zip(self.scores.row(row).into_iter().copied())
    }
}

/// Ranks every emoji for every vocabulary vector and keeps the top `k`.
///
/// With fewer than `k` emoji every row holds all of them. NaN similarities
/// rank last and are reported as negative infinity.
pub fn rank(vocab: &Array2<f32>, emoji: &Array2<f32>, k: usize, metric: Metric) -> Result<Ranking> {
    let n_vocab = vocab.nrows();
    let n_emoji = emoji.nrows();
    let k = k.min(n_emoji);

    if n_vocab == 0 || k == 0 {
        return Ok(Ranking::empty(n_vocab));
    }
    if vocab.ncols() != emoji.ncols() {
        return Err(Error::Encoding(format!(
            "vocabulary vectors have dimension {} but emoji vectors have {}",
            vocab.ncols(),
            emoji.ncols()
        )));
    }

    let started = Instant::now();
    let (left, right) = match metric {
        Metric::Cosine => (normalized_rows(vocab.view()), normalized_rows(emoji.view())),
        Metric::Dot => (vocab.to_owned(), emoji.to_owned()),
    };
    let right_t = right.t();

    let starts: Vec<usize> = (0..n_vocab).step_by(ROW_BLOCK).collect();
    let blocks: Vec<Vec<Vec<(usize, f32)>>> = starts
        .into_par_iter()
        .map(|start| {
            let end = (start + ROW_BLOCK).min(n_vocab);
            let sims = left.slice(s![start..end, ..]).dot(&right_t);
            sims.axis_iter(Axis(0))
                .map(|row| top_k_row(row, k))
                .collect()
        })
        .collect();

    let mut indices = Array2::<usize>::zeros((n_vocab, k));
    let mut scores = Array2::<f32>::zeros((n_vocab, k));
    for (i, ranked) in blocks.into_iter().flatten().enumerate() {
        for (j, (emoji_row, score)) in ranked.into_iter().enumerate() {
            indices[[i, j]] = emoji_row;
            scores[[i, j]] = score;
        }
    }

    info!(
        vocab = n_vocab,
        emoji = n_emoji,
        k,
        metric = %metric,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Ranked similarities"
    );
    Ok(Ranking { indices, scores })
}

/// Similarity of two vectors under `metric`. Zero vectors have cosine 0.
pub fn similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>, metric: Metric) -> f32 {
    let dot = a.dot(&b);
    match metric {
        Metric::Dot => dot,
        Metric::Cosine => {
            let norm = a.dot(&a).sqrt() * b.dot(&b).sqrt();
            if norm == 0.0 {
                0.0
            } else {
                dot / norm
            }
        }
    }
}

fn normalized_rows(matrix: ArrayView2<'_, f32>) -> Array2<f32> {
    let mut out = matrix.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        let norm = row.dot(&row).sqrt();
        if norm > 0.0 {
            row /= norm;
        }
    }
    out
}

fn by_score_then_row(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then(a.0.cmp(&b.0))
}

fn top_k_row(row: ArrayView1<'_, f32>, k: usize) -> Vec<(usize, f32)> {
    let mut candidates: Vec<(usize, f32)> = row
        .iter()
        .enumerate()
        .map(|(i, &score)| (i, if score.is_nan() { f32::NEG_INFINITY } else { score }))
        .collect();

    if k < candidates.len() {
        candidates.select_nth_unstable_by(k - 1, by_score_then_row);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(by_score_then_row);
    candidates
}
