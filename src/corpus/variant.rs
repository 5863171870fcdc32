// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base/variant classification of emoji labels.
//!
//! Skin-tone variants carry one or more `_<tone>_skin_tone` tokens in their
//! label (`:waving_hand_medium-dark_skin_tone:`). Gender variants start with
//! `:man_` or `:woman_` and have a neutral counterpart in the same corpus
//! (`:man_technologist:` -> `:technologist:`, `:woman_running:` ->
//! `:person_running:`). Both can apply to the same label.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

const SKIN_TONE_SUFFIX: &str = "_skin_tone";

/// Skin-tone modifier, from lightest to darkest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkinTone {
    Light,
    MediumLight,
    Medium,
    MediumDark,
    Dark,
}

impl SkinTone {
    pub const ALL: [SkinTone; 5] = [
        SkinTone::Light,
        SkinTone::MediumLight,
        SkinTone::Medium,
        SkinTone::MediumDark,
        SkinTone::Dark,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinTone::Light => "light",
            SkinTone::MediumLight => "medium-light",
            SkinTone::Medium => "medium",
            SkinTone::MediumDark => "medium-dark",
            SkinTone::Dark => "dark",
        }
    }

    /// The label token for this tone, e.g. `medium-light_skin_tone`.
    pub fn token(&self) -> String {
        format!("{}{}", self.as_str(), SKIN_TONE_SUFFIX)
    }
}

impl fmt::Display for SkinTone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkinTone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_lowercase();
        let value = value
            .strip_suffix(SKIN_TONE_SUFFIX)
            .unwrap_or(&value)
            .replace('_', "-");
        SkinTone::ALL
            .into_iter()
            .find(|tone| tone.as_str() == value)
            .ok_or_else(|| format!("Unknown skin tone: {}", s))
    }
}

/// Gendered form of an emoji whose neutral form is the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Man,
    Woman,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Man, Gender::Woman];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Man => "man",
            Gender::Woman => "woman",
        }
    }

    /// Label prefix of this gender's variants, e.g. `:woman_`.
    pub fn prefix(&self) -> String {
        format!(":{}_", self.as_str())
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "man" | "male" | "m" => Ok(Gender::Man),
            "woman" | "female" | "w" | "f" => Ok(Gender::Woman),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }
}

/// Classification of one emoji label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EmojiKind {
    Base,
    Variant {
        /// Label of the base emoji this variant resolves to.
        base: String,
        /// Tones in label order; empty for pure gender variants.
        skin_tones: Vec<SkinTone>,
        gender: Option<Gender>,
    },
}

impl EmojiKind {
    pub fn is_variant(&self) -> bool {
        matches!(self, EmojiKind::Variant { .. })
    }
}

/// Removes every skin-tone token from `label`, returning the remaining label
/// and the tones found in label order.
pub fn strip_skin_tones(label: &str) -> (String, Vec<SkinTone>) {
    let mut rest = label.to_string();
    let mut found: Vec<(usize, SkinTone)> = Vec::new();
    let mut offset = 0usize;

    loop {
        let next = SkinTone::ALL
            .into_iter()
            .filter_map(|tone| find_tone_token(&rest, tone).map(|pos| (pos, tone)))
            .min_by_key(|(pos, _)| *pos);

        let Some((pos, tone)) = next else {
            break;
        };

        let token_len = tone.token().len() + 1;
        rest.replace_range(pos..pos + token_len, "");
        found.push((pos + offset, tone));
        offset += token_len;
    }

    found.sort_by_key(|(pos, _)| *pos);
    (rest, found.into_iter().map(|(_, tone)| tone).collect())
}

/// Position of `_<tone>_skin_tone` in `label`, only where the token ends at a
/// word boundary.
fn find_tone_token(label: &str, tone: SkinTone) -> Option<usize> {
    let needle = format!("_{}", tone.token());
    label.match_indices(&needle).map(|(pos, _)| pos).find(|&pos| {
        matches!(
            label[pos + needle.len()..].chars().next(),
            None | Some(':') | Some('_') | Some(',')
        )
    })
}

/// Splits a gendered label into its gender and the label remainder after the
/// `:man_` / `:woman_` prefix.
pub fn split_gender(label: &str) -> Option<(Gender, &str)> {
    Gender::ALL.into_iter().find_map(|gender| {
        label
            .strip_prefix(gender.prefix().as_str())
            .filter(|rest| !rest.is_empty() && *rest != ":")
            .map(|rest| (gender, rest))
    })
}

/// Classifies every label of a corpus.
///
/// Gender variants need the whole label set: `:man_dancing:` is a base emoji
/// because no `:dancing:` or `:person_dancing:` exists.
pub fn classify_labels<S: AsRef<str>>(labels: &[S]) -> Vec<EmojiKind> {
    let known: HashSet<&str> = labels.iter().map(|l| l.as_ref()).collect();

    labels
        .iter()
        .map(|label| {
            let label = label.as_ref();
            let (toneless, skin_tones) = strip_skin_tones(label);

            let mut base = toneless.clone();
            let mut gender = None;
            if let Some((g, rest)) = split_gender(&toneless) {
                let neutral = [format!(":{}", rest), format!(":person_{}", rest)]
                    .into_iter()
                    .find(|candidate| known.contains(candidate.as_str()));
                if let Some(neutral) = neutral {
                    base = neutral;
                    gender = Some(g);
                }
            }

            if skin_tones.is_empty() && gender.is_none() {
                EmojiKind::Base
            } else {
                EmojiKind::Variant {
                    base,
                    skin_tones,
                    gender,
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_single_tone() {
        let (base, tones) = strip_skin_tones(":waving_hand_medium-dark_skin_tone:");
        assert_eq!(base, ":waving_hand:");
        assert_eq!(tones, vec![SkinTone::MediumDark]);
    }

    #[test]
    fn strips_multiple_tones_in_label_order() {
        let (base, tones) = strip_skin_tones(":handshake_light_skin_tone_dark_skin_tone:");
        assert_eq!(base, ":handshake:");
        assert_eq!(tones, vec![SkinTone::Light, SkinTone::Dark]);
    }

    #[test]
    fn medium_light_is_not_mistaken_for_light() {
        let (base, tones) = strip_skin_tones(":thumbs_up_medium-light_skin_tone:");
        assert_eq!(base, ":thumbs_up:");
        assert_eq!(tones, vec![SkinTone::MediumLight]);
    }

    #[test]
    fn tone_swatch_is_a_base() {
        let (base, tones) = strip_skin_tones(":light_skin_tone:");
        assert_eq!(base, ":light_skin_tone:");
        assert!(tones.is_empty());
    }

    #[test]
    fn classifies_gender_variants_against_neutral_forms() {
        let labels = [
            ":technologist:",
            ":man_technologist:",
            ":woman_technologist_dark_skin_tone:",
            ":person_running:",
            ":woman_running:",
            ":man_dancing:",
        ];
        let kinds = classify_labels(&labels);

        assert_eq!(kinds[0], EmojiKind::Base);
        assert_eq!(
            kinds[1],
            EmojiKind::Variant {
                base: ":technologist:".to_string(),
                skin_tones: vec![],
                gender: Some(Gender::Man),
            }
        );
        assert_eq!(
            kinds[2],
            EmojiKind::Variant {
                base: ":technologist:".to_string(),
                skin_tones: vec![SkinTone::Dark],
                gender: Some(Gender::Woman),
            }
        );
        assert_eq!(kinds[3], EmojiKind::Base);
        assert_eq!(
            kinds[4],
            EmojiKind::Variant {
                base: ":person_running:".to_string(),
                skin_tones: vec![],
                gender: Some(Gender::Woman),
            }
        );
        assert_eq!(kinds[5], EmojiKind::Base);
    }

    #[test]
    fn tone_variant_without_base_stays_variant() {
        let kinds = classify_labels(&[":ninja_light_skin_tone:"]);
        assert_eq!(
            kinds[0],
            EmojiKind::Variant {
                base: ":ninja:".to_string(),
                skin_tones: vec![SkinTone::Light],
                gender: None,
            }
        );
    }

    #[test]
    fn parses_tones_and_genders() {
        assert_eq!("medium-dark".parse::<SkinTone>().unwrap(), SkinTone::MediumDark);
        assert_eq!("dark_skin_tone".parse::<SkinTone>().unwrap(), SkinTone::Dark);
        assert_eq!("medium_light".parse::<SkinTone>().unwrap(), SkinTone::MediumLight);
        assert!("purple".parse::<SkinTone>().is_err());
        assert_eq!("Woman".parse::<Gender>().unwrap(), Gender::Woman);
        assert!("person".parse::<Gender>().is_err());
    }
}
