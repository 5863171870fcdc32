// SPDX-License-Identifier: MIT OR Apache-2.0

//! emoji-search - Semantic emoji search library
//!
//! Offline pipeline that embeds a vocabulary and an emoji description corpus,
//! ranks every emoji for every word, and persists a SQLite lookup table that
//! the runtime queries without any model inference.

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod ranking;
pub mod store;

pub use errors::{Error, Result};
