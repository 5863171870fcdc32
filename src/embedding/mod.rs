// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding module - providers and vector building
//!
//! Providers turn text into dense vectors; the vector builder applies a
//! provider to the emoji corpus and the vocabulary, producing matrices whose
//! rows are tracked by an explicit id map.

pub mod provider;
pub mod vectors;

pub use provider::{
    canonical_model_name, create_provider, parse_model_name, CommandProvider, DummyProvider, EmbeddingProvider,
    EmbeddingProviderConfig, FastEmbedder, DUMMY_MODEL,
};
pub use vectors::{build_emoji_vectors, build_vocab_vectors, embed_all, EmbeddedSet, IdMap};
