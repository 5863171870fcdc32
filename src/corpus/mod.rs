// SPDX-License-Identifier: MIT OR Apache-2.0

//! Corpus loading - emoji descriptions and the search vocabulary.

pub mod emoji;
pub mod variant;
pub mod vocab;

pub use emoji::{EmojiCorpus, EmojiRecord, RawEmoji};
pub use variant::{classify_labels, EmojiKind, Gender, SkinTone};
pub use vocab::{load_vocabulary, normalize_word, vocabulary_from_lines, VocabularyWord};
