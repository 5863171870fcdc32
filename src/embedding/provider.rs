// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding provider interface and implementations.
//!
//! A provider is constructed once per run (loading its model) and then passed
//! explicitly to the pipeline stages that need it.

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use serde_json::Value;
use std::borrow::Cow;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

use crate::config::{EmbeddingConfig, EmbeddingProviderType};
use crate::errors::{Error, Result};

pub const DEFAULT_FASTEMBED_BATCH_SIZE: usize = 256;
const MAX_FASTEMBED_BATCH_SIZE: usize = 1024;
const DEFAULT_FASTEMBED_MAX_CHARS: usize = 2000;
const DEFAULT_COMMAND_BATCH_SIZE: usize = 64;

/// Model name that selects the zero-vector provider.
pub const DUMMY_MODEL: &str = "dummy";

/// Configuration for the fastembed provider.
#[derive(Debug, Clone)]
pub struct EmbeddingProviderConfig {
    pub batch_size: usize,
    pub max_chars: usize,
    pub normalize: bool,
    pub cache_dir: Option<PathBuf>,
}

impl EmbeddingProviderConfig {
    /// Builds the provider config from the file config, then applies
    /// `FASTEMBED_*` environment overrides.
    pub fn resolve(config: &EmbeddingConfig) -> Result<Self> {
        let mut batch_size =
            env_override("FASTEMBED_BATCH_SIZE", config.batch_size(), |v| v.parse().ok())?;
        if batch_size == 0 {
            batch_size = DEFAULT_FASTEMBED_BATCH_SIZE;
        }
        if batch_size > MAX_FASTEMBED_BATCH_SIZE {
            warn!(
                batch_size,
                max = MAX_FASTEMBED_BATCH_SIZE,
                "Embedding batch size exceeds maximum; clamping"
            );
            batch_size = MAX_FASTEMBED_BATCH_SIZE;
        }

        let mut max_chars =
            env_override("FASTEMBED_MAX_CHARS", config.max_chars(), |v| v.parse().ok())?;
        if max_chars == 0 {
            max_chars = DEFAULT_FASTEMBED_MAX_CHARS;
        }

        let normalize = env_override("FASTEMBED_NORMALIZE", config.normalize(), parse_flag)?;

        Ok(Self {
            batch_size,
            max_chars,
            normalize,
            cache_dir: config.cache_dir.clone(),
        })
    }
}

impl Default for EmbeddingProviderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_FASTEMBED_BATCH_SIZE,
            max_chars: DEFAULT_FASTEMBED_MAX_CHARS,
            normalize: true,
            cache_dir: None,
        }
    }
}

/// Trait for embedding providers.
pub trait EmbeddingProvider: Send {
    /// Returns the model identifier.
    fn model_id(&self) -> &str;

    /// Returns the batch size used by the provider.
    fn batch_size(&self) -> usize;

    /// Generates one embedding per text, in input order.
    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Generates an embedding for a single text.
    fn embed_one(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut result = self.embed_texts(&[text.to_string()])?;
        result
            .pop()
            .ok_or_else(|| Error::Encoding("No embedding returned".to_string()))
    }
}

/// Creates the provider for `model` as configured.
///
/// The `dummy` model name always selects [`DummyProvider`].
pub fn create_provider(model: &str, config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    if model.eq_ignore_ascii_case(DUMMY_MODEL) {
        return Ok(Box::new(DummyProvider::new(config.dimension())));
    }

    match config.provider() {
        EmbeddingProviderType::Builtin => {
            let provider_config = EmbeddingProviderConfig::resolve(config)?;
            Ok(Box::new(FastEmbedder::new(model, provider_config)?))
        }
        EmbeddingProviderType::Command => Ok(Box::new(CommandProvider::new(
            config.command().to_string(),
            model.to_string(),
        ))),
        EmbeddingProviderType::Dummy => Ok(Box::new(DummyProvider::new(config.dimension()))),
    }
}

/// FastEmbed provider running an ONNX sentence-embedding model on the CPU.
pub struct FastEmbedder {
    embedder: TextEmbedding,
    config: EmbeddingProviderConfig,
    model_id: String,
}

impl FastEmbedder {
    /// Loads the named model, downloading it on first use.
    pub fn new(model_name: &str, config: EmbeddingProviderConfig) -> Result<Self> {
        let model = parse_model_name(model_name)?;

        let mut init = InitOptions::new(model).with_show_download_progress(true);
        if let Some(cache_dir) = &config.cache_dir {
            std::fs::create_dir_all(cache_dir)
                .map_err(|e| Error::model_load(model_name, format!("cache directory: {}", e)))?;
            init = init.with_cache_dir(cache_dir.clone());
        }

        info!(model = model_name, "Loading embedding model");
        let embedder = TextEmbedding::try_new(init).map_err(|e| Error::model_load(model_name, e))?;

        Ok(Self {
            embedder,
            config,
            model_id: canonical_model_name(model_name),
        })
    }
}

impl EmbeddingProvider for FastEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let prepared = truncate_texts(texts, self.config.max_chars);
        let mut embeddings = self
            .embedder
            .embed(&prepared, Some(self.config.batch_size))
            .map_err(|e| Error::Encoding(e.to_string()))?;

        if self.config.normalize {
            for embedding in embeddings.iter_mut() {
                l2_normalize(embedding);
            }
        }

        Ok(embeddings)
    }
}

/// Command provider that shells out to an external process.
///
/// The command receives `{"model": ..., "texts": [...]}` on stdin and prints
/// either a JSON array of vectors or an object with an `embeddings`,
/// `vectors` or `data` array.
pub struct CommandProvider {
    command: String,
    model: String,
    batch_size: usize,
}

impl CommandProvider {
    pub fn new(command: String, model: String) -> Self {
        Self {
            command,
            model,
            batch_size: DEFAULT_COMMAND_BATCH_SIZE,
        }
    }

    fn run_command(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let payload = serde_json::json!({
            "model": self.model,
            "texts": texts,
        });

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::model_load(
                    &self.model,
                    format!("failed to spawn embedding command '{}': {}", self.command, e),
                )
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload_str = payload.to_string();
            stdin.write_all(payload_str.as_bytes()).map_err(|e| {
                Error::Encoding(format!("failed to write embeddings payload to stdin: {}", e))
            })?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Encoding(format!("failed to read embeddings command output: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Encoding(format!(
                "embedding command failed (status {}): {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_command_output(stdout.trim())
    }
}

impl EmbeddingProvider for CommandProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), command = %self.command, "Running embedding command");
        self.run_command(texts)
    }
}

fn parse_command_output(stdout: &str) -> Result<Vec<Vec<f32>>> {
    let encoding = |msg: &str| Error::Encoding(msg.to_string());

    let parsed: Value = serde_json::from_str(stdout)
        .map_err(|e| Error::Encoding(format!("embeddings command output is not JSON: {}", e)))?;

    let embeddings_value = match parsed {
        Value::Array(arr) => Value::Array(arr),
        Value::Object(mut obj) => ["embeddings", "vectors", "data"]
            .iter()
            .find_map(|key| obj.remove(*key))
            .ok_or_else(|| encoding("embeddings command output missing 'embeddings' field"))?,
        _ => return Err(encoding("embeddings command output must be JSON array or object")),
    };

    embeddings_value
        .as_array()
        .ok_or_else(|| encoding("embeddings output must be a JSON array"))?
        .iter()
        .map(|row| {
            row.as_array()
                .ok_or_else(|| encoding("embedding row must be an array"))?
                .iter()
                .map(|value| {
                    value
                        .as_f64()
                        .ok_or_else(|| encoding("embedding value must be a number"))
                        .map(|v| v as f32)
                })
                .collect::<Result<Vec<f32>>>()
        })
        .collect::<Result<Vec<Vec<f32>>>>()
}

/// Dummy provider that returns zero vectors (for testing/fallback).
pub struct DummyProvider {
    model: String,
    dimension: usize,
    batch_size: usize,
}

impl DummyProvider {
    /// Creates a new dummy provider with specified dimension.
    pub fn new(dimension: usize) -> Self {
        Self {
            model: DUMMY_MODEL.to_string(),
            dimension,
            batch_size: DEFAULT_FASTEMBED_BATCH_SIZE,
        }
    }
}

impl EmbeddingProvider for DummyProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn embed_texts(&mut self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors: Vec<Vec<f32>> = texts.iter().map(|_| vec![0.0; self.dimension]).collect();

        Ok(vectors)
    }
}

fn truncate_texts<'a>(texts: &'a [String], max_chars: usize) -> Vec<Cow<'a, str>> {
    texts
        .iter()
        .map(|text| truncate_to_chars(text.as_str(), max_chars))
        .collect()
}

fn truncate_to_chars<'a>(input: &'a str, max_chars: usize) -> Cow<'a, str> {
    if max_chars == 0 {
        return Cow::Borrowed("");
    }

    match input.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(input[..idx].to_string()),
        None => Cow::Borrowed(input),
    }
}

pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

/// Normalized form of a model name, used to compare names across runs.
///
/// Case, surrounding whitespace, the hub organisation prefix and the short
/// aliases are folded, so `sentence-transformers/all-MiniLM-L6-v2` and
/// `minilm` name the same model.
pub fn canonical_model_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let short = lowered
        .strip_prefix("sentence-transformers/")
        .or_else(|| lowered.strip_prefix("baai/"))
        .or_else(|| lowered.strip_prefix("qdrant/"))
        .unwrap_or(lowered.as_str());

    match short {
        "minilm" | "allminilm-l6-v2" => "all-minilm-l6-v2".to_string(),
        "allminilm-l6-v2-q" => "all-minilm-l6-v2-q".to_string(),
        other => other.to_string(),
    }
}

/// Maps a model name (the CLI's positional argument) to a fastembed model.
pub fn parse_model_name(name: &str) -> Result<EmbeddingModel> {
    match canonical_model_name(name).as_str() {
        "all-minilm-l6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "all-minilm-l6-v2-q" => Ok(EmbeddingModel::AllMiniLML6V2Q),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "bge-small-en-v1.5-q" => Ok(EmbeddingModel::BGESmallENV15Q),
        "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "bge-base-en-v1.5-q" => Ok(EmbeddingModel::BGEBaseENV15Q),
        "bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "bge-large-en-v1.5-q" => Ok(EmbeddingModel::BGELargeENV15Q),
        _ => Err(Error::model_load(
            name,
            "unsupported model. Supported: all-MiniLM-L6-v2, bge-small-en-v1.5, \
             bge-base-en-v1.5, bge-large-en-v1.5 (add -q for quantized), or configure \
             the command provider",
        )),
    }
}

/// Reads an optional `FASTEMBED_*` override; unset or blank keeps `default`.
fn env_override<T>(name: &str, default: T, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
    let raw = match env::var(name) {
        Ok(raw) => raw,
        Err(env::VarError::NotPresent) => return Ok(default),
        Err(err) => {
            return Err(Error::model_load("fastembed", format!("failed to read {}: {}", name, err)))
        }
    };

    let value = raw.trim();
    if value.is_empty() {
        return Ok(default);
    }
    parse(value)
        .ok_or_else(|| Error::model_load("fastembed", format!("invalid {} value: {}", name, value)))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_provider() {
        let mut provider = DummyProvider::new(384);
        assert_eq!(provider.model_id(), "dummy");

        let result = provider
            .embed_texts(&["hello".to_string(), "world".to_string()])
            .unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].len(), 384);
        assert!(result[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_empty_string_gets_a_vector() {
        let mut provider = DummyProvider::new(16);
        let vector = provider.embed_one("").unwrap();
        assert_eq!(vector.len(), 16);
    }

    #[test]
    fn test_truncate_to_chars() {
        let input = "hello";
        assert_eq!(
            truncate_to_chars(input, 2),
            Cow::<str>::Owned("he".to_string())
        );
        assert_eq!(truncate_to_chars(input, 5), Cow::Borrowed(input));
        assert_eq!(truncate_to_chars("🌸🌼💐", 2), Cow::<str>::Owned("🌸🌼".to_string()));
    }

    #[test]
    fn test_l2_normalize_leaves_zero_vector() {
        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);

        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_parse_model_name() {
        assert!(matches!(
            parse_model_name("sentence-transformers/all-MiniLM-L6-v2").unwrap(),
            EmbeddingModel::AllMiniLML6V2
        ));
        assert!(matches!(
            parse_model_name("BAAI/bge-small-en-v1.5").unwrap(),
            EmbeddingModel::BGESmallENV15
        ));
        let err = parse_model_name("all-mpnet-base-v2").unwrap_err();
        assert!(matches!(err, Error::ModelLoad { .. }));
    }

    #[test]
    fn test_canonical_model_name_folds_aliases() {
        let canonical = canonical_model_name("sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(canonical, "all-minilm-l6-v2");
        assert_eq!(canonical_model_name(" MiniLM "), canonical);
        assert_eq!(canonical_model_name("AllMiniLM-L6-v2"), canonical);
        assert_eq!(canonical_model_name("BAAI/bge-small-en-v1.5"), "bge-small-en-v1.5");
        assert_ne!(canonical_model_name("bge-small-en-v1.5-q"), "bge-small-en-v1.5");
    }

    #[test]
    fn test_parse_command_output_shapes() {
        let bare = parse_command_output("[[1.0, 2.0], [3.0, 4.0]]").unwrap();
        assert_eq!(bare, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let wrapped = parse_command_output(r#"{"vectors": [[0.5]]}"#).unwrap();
        assert_eq!(wrapped, vec![vec![0.5]]);

        assert!(parse_command_output(r#"{"other": []}"#).is_err());
        assert!(parse_command_output("[[\"x\"]]").is_err());
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("Yes"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_dummy_model_name_selects_dummy_provider() {
        let provider = create_provider("dummy", &EmbeddingConfig::default()).unwrap();
        assert_eq!(provider.model_id(), "dummy");
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_fastembed_model_load() {
        let mut provider =
            FastEmbedder::new("all-MiniLM-L6-v2", EmbeddingProviderConfig::default()).unwrap();
        let vectors = provider
            .embed_texts(&["flower".to_string(), String::new()])
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 384);
    }
}
