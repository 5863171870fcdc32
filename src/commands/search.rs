// SPDX-License-Identifier: MIT OR Apache-2.0

//! Look up emoji for a word

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use emoji_search::config::Config;
use emoji_search::corpus::{Gender, SkinTone};
use emoji_search::embedding::create_provider;
use emoji_search::output::{colorize_query, format_hit, print_json, use_colors};
use emoji_search::ranking::Metric;
use emoji_search::store::{meta_keys, EmojiHit, EmojiIndex};

/// Search options beyond the query itself.
#[derive(Debug, Default)]
pub struct SearchArgs {
    pub db: Option<PathBuf>,
    pub limit: Option<usize>,
    pub skin_tone: Option<SkinTone>,
    pub gender: Option<Gender>,
    pub live: Option<String>,
}

/// Run the search command
pub fn run(query: &str, args: SearchArgs, format: OutputFormat, compact: bool) -> Result<()> {
    let config = Config::load();
    let index = super::open_index(args.db, &config)?;

    let mut hits = match &args.live {
        Some(model) => {
            let mut provider = create_provider(model, config.embeddings())
                .with_context(|| format!("Failed to load embedding model '{}'", model))?;
            let metric = stored_metric(&index)?.unwrap_or_else(|| config.ranking.metric());
            let k = args.limit.unwrap_or_else(|| config.ranking.top_k());
            index
                .live_search(provider.as_mut(), query, k, metric)
                .with_context(|| format!("Live search failed for '{}'", query))?
        }
        None => index.top_emojis(query)?,
    };

    if let Some(limit) = args.limit {
        hits.truncate(limit);
    }
    if args.skin_tone.is_some() || args.gender.is_some() {
        hits = apply_preference(&index, hits, args.skin_tone, args.gender)?;
    }

    match format {
        OutputFormat::Json => print_json(&hits, compact)?,
        OutputFormat::Text => {
            let use_color = use_colors();
            if hits.is_empty() {
                println!("{} No emoji found for: {}", "✗".red(), query.yellow());
                return Ok(());
            }
            println!("\n{} {}\n", "🔍".cyan(), colorize_query(query, use_color));
            for hit in &hits {
                println!("{}", format_hit(hit, use_color));
            }
        }
    }

    Ok(())
}

fn stored_metric(index: &EmojiIndex) -> Result<Option<Metric>> {
    Ok(index
        .meta_value(meta_keys::METRIC)?
        .and_then(|value| value.parse().ok()))
}

/// Swaps each base hit for its preferred variant, keeping rank and score.
fn apply_preference(
    index: &EmojiIndex,
    hits: Vec<EmojiHit>,
    skin_tone: Option<SkinTone>,
    gender: Option<Gender>,
) -> Result<Vec<EmojiHit>> {
    hits.into_iter()
        .map(|hit| -> Result<EmojiHit> {
            Ok(match index.preferred_variant(&hit.label, skin_tone, gender)? {
                Some(entry) => EmojiHit {
                    label: entry.label,
                    text: entry.text,
                    emoji: entry.emoji,
                    ..hit
                },
                None => hit,
            })
        })
        .collect()
}
