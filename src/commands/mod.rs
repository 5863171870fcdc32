// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command implementations for the emoji-search binary

pub mod info;
pub mod precompute;
pub mod search;
pub mod variants;

use anyhow::{Context, Result};
use emoji_search::config::Config;
use emoji_search::store::EmojiIndex;
use std::path::PathBuf;

/// Opens the store named on the command line, else the configured one.
pub(crate) fn open_index(db: Option<PathBuf>, config: &Config) -> Result<EmojiIndex> {
    let path = db.unwrap_or_else(|| config.store.path());
    EmojiIndex::open(&path)
        .with_context(|| format!("Failed to open lookup store {}", path.display()))
}
