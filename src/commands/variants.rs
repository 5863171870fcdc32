// SPDX-License-Identifier: MIT OR Apache-2.0

//! List variants of an emoji

use anyhow::Result;
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::OutputFormat;
use emoji_search::config::Config;
use emoji_search::output::{colorize_label, print_json, use_colors};
use emoji_search::store::EmojiEntry;

/// Run the variants command
pub fn run(label: &str, db: Option<PathBuf>, format: OutputFormat, compact: bool) -> Result<()> {
    let config = Config::load();
    let index = super::open_index(db, &config)?;

    let mut entries: Vec<EmojiEntry> = Vec::new();
    for variant in index.add_variants(label)? {
        if let Some(entry) = index.emoji(&variant)? {
            entries.push(entry);
        }
    }

    match format {
        OutputFormat::Json => print_json(&entries, compact)?,
        OutputFormat::Text => {
            let use_color = use_colors();
            match index.base_label(label)? {
                None => {
                    println!("{} Unknown emoji label: {}", "✗".red(), label.yellow());
                }
                Some(base) if base != label => {
                    println!(
                        "{} {} is a variant of {}",
                        "ℹ".blue(),
                        colorize_label(label, use_color),
                        colorize_label(&base, use_color)
                    );
                }
                Some(_) if entries.is_empty() => {
                    println!("{} {} has no variants", "ℹ".blue(), colorize_label(label, use_color));
                }
                Some(_) => {
                    for entry in &entries {
                        let mut tags = Vec::new();
                        if let Some(tone) = &entry.skin_tone {
                            tags.push(tone.as_str());
                        }
                        if let Some(gender) = &entry.gender {
                            tags.push(gender.as_str());
                        }
                        println!(
                            "  {}  {} {}",
                            entry.emoji,
                            colorize_label(&entry.label, use_color),
                            tags.join(", ").dimmed()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
