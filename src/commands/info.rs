// SPDX-License-Identifier: MIT OR Apache-2.0

//! Show lookup store metadata

use anyhow::Result;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use emoji_search::config::Config;
use emoji_search::output::print_json;

/// Run the info command
pub fn run(db: Option<PathBuf>, format: OutputFormat, compact: bool) -> Result<()> {
    let config = Config::load();
    let index = super::open_index(db, &config)?;
    let meta = index.meta()?;
    let words = index.vocabulary_size()?;

    match format {
        OutputFormat::Json => {
            let mut map: BTreeMap<String, String> = meta.into_iter().collect();
            map.insert("vocabulary_size".to_string(), words.to_string());
            print_json(&map, compact)?;
        }
        OutputFormat::Text => {
            println!("{} {}", "📦".cyan(), index.path().display().to_string().cyan());
            println!("  {} vocabulary words", words.to_string().green());
            if meta.is_empty() {
                println!("  {}", "no metadata recorded".dimmed());
            }
            let width = meta.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
            for (key, value) in &meta {
                let key = format!("{:width$}", key, width = width);
                println!("  {}  {}", key.yellow(), value);
            }
        }
    }

    Ok(())
}
