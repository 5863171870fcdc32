// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build the lookup store

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use emoji_search::config::Config;
use emoji_search::embedding::create_provider;
use emoji_search::output::print_json;
use emoji_search::pipeline::{self, PipelineOptions};
use emoji_search::ranking::Metric;

/// Command-line overrides of the configured pipeline options.
#[derive(Debug, Default)]
pub struct Overrides {
    pub emoji_corpus: Option<PathBuf>,
    pub vocabulary: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub overwrite: bool,
    pub strict_metadata: bool,
    pub top_k: Option<usize>,
    pub vocab_limit: Option<usize>,
    pub metric: Option<Metric>,
}

impl Overrides {
    fn apply(self, options: &mut PipelineOptions) {
        if let Some(path) = self.emoji_corpus {
            options.emoji_path = path;
        }
        if let Some(path) = self.vocabulary {
            options.vocabulary_path = path;
        }
        if let Some(path) = self.output {
            options.store_path = path;
        }
        if let Some(top_k) = self.top_k {
            options.top_k = top_k;
        }
        if let Some(limit) = self.vocab_limit {
            options.vocab_limit = limit;
        }
        if let Some(metric) = self.metric {
            options.metric = metric;
        }
        options.write.overwrite = self.overwrite;
        options.write.strict_metadata = self.strict_metadata;
    }
}

/// Run the precompute command
pub fn run(model: &str, overrides: Overrides, format: OutputFormat, compact: bool) -> Result<()> {
    let config = Config::load();
    let mut options = PipelineOptions::from_config(&config);
    overrides.apply(&mut options);

    let mut provider = create_provider(model, config.embeddings())
        .with_context(|| format!("Failed to load embedding model '{}'", model))?;
    let report = pipeline::run(provider.as_mut(), &options)
        .with_context(|| format!("Precompute failed for {}", options.store_path.display()))?;

    match format {
        OutputFormat::Json => print_json(&report, compact)?,
        OutputFormat::Text => {
            println!(
                "{} Ranked {} emoji for {} words with {}",
                "✓".green(),
                report.base_emoji_count,
                report.vocab_count,
                report.model.cyan()
            );
            println!(
                "  {} lookup rows (top {}) written to {} in {:.1}s",
                report.lookup_rows,
                report.top_k,
                report.store_path.display().to_string().cyan(),
                report.elapsed_ms as f64 / 1000.0
            );
        }
    }

    Ok(())
}
