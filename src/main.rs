// SPDX-License-Identifier: MIT OR Apache-2.0

//! emoji-search - Semantic emoji search
//!
//! Precomputes a ranked word-to-emoji table with a sentence embedding model
//! and serves lookups from SQLite.

mod cli;
mod commands;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Initialize tracing with EMOJI_SEARCH_LOG env var (e.g., EMOJI_SEARCH_LOG=info emoji-search precompute ...)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_env("EMOJI_SEARCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let compact = cli.compact;

    match cli.command {
        Commands::Precompute {
            model,
            emoji_corpus,
            vocabulary,
            output,
            overwrite,
            strict_metadata,
            top_k,
            vocab_limit,
            metric,
        } => {
            let overrides = commands::precompute::Overrides {
                emoji_corpus,
                vocabulary,
                output,
                overwrite,
                strict_metadata,
                top_k,
                vocab_limit,
                metric,
            };
            commands::precompute::run(&model, overrides, format, compact)?;
        }
        Commands::Search {
            query,
            db,
            limit,
            skin_tone,
            gender,
            live,
        } => {
            let args = commands::search::SearchArgs {
                db,
                limit,
                skin_tone,
                gender,
                live,
            };
            commands::search::run(&query, args, format, compact)?;
        }
        Commands::Variants { label, db } => {
            commands::variants::run(&label, db, format, compact)?;
        }
        Commands::Info { db } => {
            commands::info::run(db, format, compact)?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "emoji-search", &mut std::io::stdout());
        }
    }

    Ok(())
}
