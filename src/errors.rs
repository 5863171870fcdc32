// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by the precompute pipeline and the lookup store.

use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by emoji-search.
///
/// Every pipeline failure aborts the run; nothing is retried or partially
/// persisted. Unknown queries at lookup time are not errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The embedding model could not be resolved or initialized.
    #[error("Failed to load embedding model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    /// A batch of texts could not be turned into vectors.
    #[error("Embedding failed: {0}")]
    Encoding(String),

    /// The store is already populated and replacing it was not requested, or
    /// it is not a lookup store.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// An emoji or vocabulary source file is missing or malformed.
    #[error("Invalid corpus file {}: {reason}", path.display())]
    CorpusFormat { path: PathBuf, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn model_load(model: impl Into<String>, reason: impl ToString) -> Self {
        Error::ModelLoad {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corpus(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::CorpusFormat {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
