// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI argument parsing using clap

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use emoji_search::corpus::{Gender, SkinTone};
use emoji_search::ranking::Metric;

/// emoji-search - Semantic emoji search
///
/// Precomputes a word-to-emoji lookup table with a sentence embedding model
/// and answers queries from it without running the model.
#[derive(Parser, Debug)]
#[command(name = "emoji-search")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty formatting)
    #[arg(long, global = true)]
    pub compact: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Embed the corpus and vocabulary and write the lookup store
    Precompute {
        /// Embedding model (e.g. all-MiniLM-L6-v2, BAAI/bge-small-en-v1.5, dummy)
        model: String,

        /// Emoji corpus CSV with label, emoji and text columns
        #[arg(long = "emoji-corpus")]
        emoji_corpus: Option<PathBuf>,

        /// Vocabulary file, one word per line
        #[arg(long)]
        vocabulary: Option<PathBuf>,

        /// Output SQLite database
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace an existing lookup table
        #[arg(long)]
        overwrite: bool,

        /// Refuse to write when emoji metadata is already stored
        #[arg(long)]
        strict_metadata: bool,

        /// Emoji kept per vocabulary word
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Vocabulary words kept from the top of the list
        #[arg(long)]
        vocab_limit: Option<usize>,

        /// Similarity metric (cos or dot)
        #[arg(long)]
        metric: Option<Metric>,
    },

    /// Look up the ranked emoji for a word
    #[command(alias = "s")]
    Search {
        /// Word to look up
        query: String,

        /// Lookup store (defaults to main.db)
        #[arg(long)]
        db: Option<PathBuf>,

        /// Maximum number of results
        #[arg(short = 'm', long)]
        limit: Option<usize>,

        /// Show the variant with this skin tone when one exists
        #[arg(long)]
        skin_tone: Option<SkinTone>,

        /// Show the gendered variant when one exists (man or woman)
        #[arg(long)]
        gender: Option<Gender>,

        /// Embed the query with this model instead of using the lookup table
        #[arg(long, value_name = "MODEL")]
        live: Option<String>,
    },

    /// List the skin tone and gender variants of an emoji
    Variants {
        /// Emoji label, e.g. :waving_hand:
        label: String,

        /// Lookup store (defaults to main.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Show the metadata recorded in a lookup store
    Info {
        /// Lookup store (defaults to main.db)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
