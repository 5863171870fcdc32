// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration file support for emoji-search
//!
//! Loads configuration from .emojisearchrc.toml in current directory or
//! ~/.config/emoji-search/config.toml

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ranking::{Metric, DEFAULT_TOP_K};
use crate::store::DEFAULT_STORE_FILE;

/// Conventional emoji corpus file name.
pub const DEFAULT_EMOJI_FILE: &str = "emoji_df.csv";
/// Conventional vocabulary file name.
pub const DEFAULT_VOCABULARY_FILE: &str = "cleaned_wordlist_all.txt";
/// Default number of vocabulary words kept.
pub const DEFAULT_VOCAB_LIMIT: usize = 30_000;

const LOCAL_CONFIG_FILE: &str = ".emojisearchrc.toml";

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderType {
    #[default]
    Builtin,
    Command,
    Dummy,
}

/// Input corpus configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Emoji corpus CSV (label, emoji, text)
    pub emoji_path: Option<PathBuf>,
    /// Newline-separated vocabulary file
    pub vocabulary_path: Option<PathBuf>,
    /// Number of vocabulary words kept
    pub vocab_limit: Option<usize>,
}

impl CorpusConfig {
    /// Get emoji corpus path (defaults to "emoji_df.csv")
    pub fn emoji_path(&self) -> PathBuf {
        self.emoji_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EMOJI_FILE))
    }

    /// Get vocabulary path (defaults to "cleaned_wordlist_all.txt")
    pub fn vocabulary_path(&self) -> PathBuf {
        self.vocabulary_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_VOCABULARY_FILE))
    }

    /// Get vocabulary limit (defaults to 30000)
    pub fn vocab_limit(&self) -> usize {
        self.vocab_limit.unwrap_or(DEFAULT_VOCAB_LIMIT)
    }
}

/// Ranking configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Number of emoji kept per vocabulary word
    pub top_k: Option<usize>,
    /// Similarity metric (cos, dot)
    pub metric: Option<Metric>,
}

impl RankingConfig {
    /// Get top k (defaults to 25)
    pub fn top_k(&self) -> usize {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    /// Get metric (defaults to cosine)
    pub fn metric(&self) -> Metric {
        self.metric.unwrap_or_default()
    }
}

/// Lookup store configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Get store path (defaults to "main.db")
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (builtin, command, dummy)
    pub provider: Option<EmbeddingProviderType>,
    /// Command to execute for command provider
    pub command: Option<String>,
    /// Texts per embedding batch
    pub batch_size: Option<usize>,
    /// Characters kept per text before embedding
    pub max_chars: Option<usize>,
    /// L2-normalize embeddings
    pub normalize: Option<bool>,
    /// Vector dimension of the dummy provider
    pub dimension: Option<usize>,
    /// Model download cache directory
    pub cache_dir: Option<PathBuf>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Builtin)
    pub fn provider(&self) -> EmbeddingProviderType {
        self.provider.unwrap_or_default()
    }

    /// Get command (defaults to "embedder")
    pub fn command(&self) -> &str {
        self.command.as_deref().unwrap_or("embedder")
    }

    /// Get batch size (defaults to 256)
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(256)
    }

    /// Get max chars (defaults to 2000)
    pub fn max_chars(&self) -> usize {
        self.max_chars.unwrap_or(2000)
    }

    /// Get normalize (defaults to true)
    pub fn normalize(&self) -> bool {
        self.normalize.unwrap_or(true)
    }

    /// Get dummy dimension (defaults to 384)
    pub fn dimension(&self) -> usize {
        self.dimension.unwrap_or(384)
    }
}

/// Configuration loaded from .emojisearchrc.toml or ~/.config/emoji-search/config.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input corpus configuration
    pub corpus: CorpusConfig,

    /// Ranking configuration
    pub ranking: RankingConfig,

    /// Store configuration
    pub store: StoreConfig,

    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
}

impl Config {
    /// Load configuration from files
    ///
    /// Precedence (highest to lowest):
    /// 1. .emojisearchrc.toml in current directory
    /// 2. ~/.config/emoji-search/config.toml
    pub fn load() -> Self {
        if let Some(config) = Self::load_from_path(Path::new(LOCAL_CONFIG_FILE)) {
            return config;
        }

        if let Some(home) = dirs::home_dir() {
            let config_path = home.join(".config").join("emoji-search").join("config.toml");
            if let Some(config) = Self::load_from_path(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Load configuration from a single file, `None` when it is missing or
    /// does not parse.
    pub fn load_from_path(path: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Get the embedding configuration
    pub fn embeddings(&self) -> &EmbeddingConfig {
        &self.embeddings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_use_conventional_names() {
        let config = Config::default();
        assert_eq!(config.corpus.emoji_path(), PathBuf::from("emoji_df.csv"));
        assert_eq!(
            config.corpus.vocabulary_path(),
            PathBuf::from("cleaned_wordlist_all.txt")
        );
        assert_eq!(config.corpus.vocab_limit(), 30_000);
        assert_eq!(config.ranking.top_k(), 25);
        assert_eq!(config.ranking.metric(), Metric::Cosine);
        assert_eq!(config.store.path(), PathBuf::from("main.db"));
        assert_eq!(config.embeddings.provider(), EmbeddingProviderType::Builtin);
        assert!(config.embeddings.normalize());
    }

    #[test]
    fn parses_all_sections() {
        let config: Config = toml::from_str(
            r#"
            [corpus]
            emoji_path = "data/emoji.csv"
            vocab_limit = 500

            [ranking]
            top_k = 10
            metric = "dot"

            [store]
            path = "out/lookup.db"

            [embeddings]
            provider = "dummy"
            dimension = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.corpus.emoji_path(), PathBuf::from("data/emoji.csv"));
        assert_eq!(
            config.corpus.vocabulary_path(),
            PathBuf::from("cleaned_wordlist_all.txt")
        );
        assert_eq!(config.corpus.vocab_limit(), 500);
        assert_eq!(config.ranking.top_k(), 10);
        assert_eq!(config.ranking.metric(), Metric::Dot);
        assert_eq!(config.store.path(), PathBuf::from("out/lookup.db"));
        assert_eq!(config.embeddings.provider(), EmbeddingProviderType::Dummy);
        assert_eq!(config.embeddings.dimension(), 8);
    }

    #[test]
    fn metric_accepts_short_name() {
        let config: Config = toml::from_str("[ranking]\nmetric = \"cos\"\n").unwrap();
        assert_eq!(config.ranking.metric(), Metric::Cosine);
    }

    #[test]
    fn invalid_file_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ranking\ntop_k = ").unwrap();
        assert!(Config::load_from_path(&path).is_none());

        std::fs::write(&path, "[ranking]\ntop_k = 3\n").unwrap();
        assert_eq!(Config::load_from_path(&path).unwrap().ranking.top_k(), 3);
    }
}
