// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output and color utilities for consistent terminal formatting
//!
//! Provides shared color functions respecting NO_COLOR environment variable.

use colored::Colorize;
use serde::Serialize;

use crate::store::EmojiHit;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize emoji label (cyan)
pub fn colorize_label(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize rank (yellow)
pub fn colorize_rank(rank: usize, use_color: bool) -> String {
    if use_color {
        rank.to_string().yellow().to_string()
    } else {
        rank.to_string()
    }
}

/// Colorize description (dimmed)
pub fn colorize_text(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize query term (bold)
pub fn colorize_query(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// One text line per hit: rank, emoji, label, similarity and description.
pub fn format_hit(hit: &EmojiHit, use_color: bool) -> String {
    format!(
        "{:>4}  {}  {} {:.3}  {}",
        colorize_rank(hit.rank, use_color),
        hit.emoji,
        colorize_label(&hit.label, use_color),
        hit.similarity,
        colorize_text(&hit.text, use_color)
    )
}

/// Prints a value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> serde_json::Result<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_hit_line_has_all_fields() {
        let hit = EmojiHit {
            label: ":rose:".to_string(),
            text: "rose".to_string(),
            emoji: "🌹".to_string(),
            rank: 2,
            similarity: 0.8125,
        };
        let line = format_hit(&hit, false);
        assert!(line.contains("🌹"));
        assert!(line.contains(":rose:"));
        assert!(line.contains("0.812") || line.contains("0.813"));
        assert!(line.trim_start().starts_with('2'));
    }
}
