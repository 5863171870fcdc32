// SPDX-License-Identifier: MIT OR Apache-2.0

//! Offline precompute pipeline: load, embed, rank, persist.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::corpus::{load_vocabulary, EmojiCorpus, VocabularyWord};
use crate::embedding::{build_emoji_vectors, build_vocab_vectors, EmbeddingProvider};
use crate::errors::Result;
use crate::ranking::{rank, Metric};
use crate::store::{preflight, LookupWriter, StoreInput, WriteOptions, WriteSummary};

/// Inputs and knobs of one precompute run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub emoji_path: PathBuf,
    pub vocabulary_path: PathBuf,
    pub vocab_limit: usize,
    pub top_k: usize,
    pub metric: Metric,
    pub store_path: PathBuf,
    pub write: WriteOptions,
}

impl PipelineOptions {
    /// Options taken from configuration defaults.
    pub fn from_config(config: &Config) -> Self {
        Self {
            emoji_path: config.corpus.emoji_path(),
            vocabulary_path: config.corpus.vocabulary_path(),
            vocab_limit: config.corpus.vocab_limit(),
            top_k: config.ranking.top_k(),
            metric: config.ranking.metric(),
            store_path: config.store.path(),
            write: WriteOptions::default(),
        }
    }
}

/// What a precompute run produced.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub model: String,
    pub emoji_count: usize,
    pub base_emoji_count: usize,
    pub vocab_count: usize,
    pub top_k: usize,
    pub dimension: usize,
    pub store_path: PathBuf,
    pub lookup_rows: usize,
    pub elapsed_ms: u64,
}

/// Runs the whole precompute pipeline with `provider`.
///
/// Any failure aborts the run; the store is only touched by the final,
/// transactional write.
pub fn run(provider: &mut dyn EmbeddingProvider, options: &PipelineOptions) -> Result<PipelineReport> {
    let started = Instant::now();

    let corpus = EmojiCorpus::load(&options.emoji_path)?;
    let vocab = load_vocabulary(&options.vocabulary_path, options.vocab_limit)?;
    info!(
        emoji = corpus.len(),
        base = corpus.base_count(),
        words = vocab.len(),
        "Loaded corpus"
    );
    preflight(&options.store_path, options.write)?;

    let summary = run_loaded(provider, &corpus, &vocab, options)?;
    let report = PipelineReport {
        model: provider.model_id().to_string(),
        emoji_count: corpus.len(),
        base_emoji_count: corpus.base_count(),
        vocab_count: vocab.len(),
        top_k: summary.top_k,
        dimension: summary.dimension,
        store_path: summary.store_path,
        lookup_rows: summary.write.lookup_rows,
        elapsed_ms: started.elapsed().as_millis() as u64,
    };

    info!(
        model = %report.model,
        lookup = report.lookup_rows,
        elapsed_ms = report.elapsed_ms,
        "Precompute complete"
    );
    Ok(report)
}

struct StageSummary {
    write: WriteSummary,
    store_path: PathBuf,
    top_k: usize,
    dimension: usize,
}

fn run_loaded(
    provider: &mut dyn EmbeddingProvider,
    corpus: &EmojiCorpus,
    vocab: &[VocabularyWord],
    options: &PipelineOptions,
) -> Result<StageSummary> {
    let emoji_vectors = build_emoji_vectors(provider, corpus)?;
    let vocab_vectors = build_vocab_vectors(provider, vocab)?;
    let ranking = rank(
        &vocab_vectors.matrix,
        &emoji_vectors.matrix,
        options.top_k,
        options.metric,
    )?;

    let mut writer = LookupWriter::open(&options.store_path)?;
    let input = StoreInput {
        ranking: &ranking,
        vocab,
        emoji_vectors: &emoji_vectors,
        corpus,
        model: provider.model_id(),
        metric: options.metric,
    };
    let write = writer.write(&input, options.write)?;
    let store_path = writer.path().to_path_buf();
    writer.close()?;

    Ok(StageSummary {
        write,
        store_path,
        top_k: ranking.k(),
        dimension: emoji_vectors.dimension(),
    })
}
