// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;

// The dummy provider embeds everything as the zero vector, so every emoji
// ties and the ranking follows corpus order.
const EMOJI_CSV: &str = "\
label,emoji,text
:waving_hand:,👋,waving hand
:waving_hand_light_skin_tone:,👋🏻,waving hand: light skin tone
:waving_hand_dark_skin_tone:,👋🏿,waving hand: dark skin tone
:technologist:,🧑‍💻,technologist
:man_technologist:,👨‍💻,man technologist
:woman_technologist:,👩‍💻,woman technologist
:flower:,🌼,flower
";

fn emoji_search(root: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("emoji-search");
    cmd.current_dir(root).env("HOME", root).env("NO_COLOR", "1");
    cmd
}

fn build_store() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("emoji_df.csv"), EMOJI_CSV).unwrap();
    fs::write(dir.path().join("cleaned_wordlist_all.txt"), "hello\ncoder\nrose\n").unwrap();
    emoji_search(dir.path())
        .args(["precompute", "dummy", "--top-k", "3"])
        .assert()
        .success();
    dir
}

fn search_json(root: &Path, args: &[&str]) -> Vec<Value> {
    let output = emoji_search(root)
        .args(["--format", "json", "--compact", "search"])
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn search_prints_ranked_hits() {
    let dir = build_store();

    emoji_search(dir.path())
        .args(["search", "Hello"])
        .assert()
        .success()
        .stdout(predicate::str::contains(":waving_hand:"))
        .stdout(predicate::str::contains(":technologist:"))
        .stdout(predicate::str::contains(":flower:"));
}

#[test]
fn search_json_has_ranks_in_order() {
    let dir = build_store();

    let hits = search_json(dir.path(), &["rose", "--limit", "2"]);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["label"], ":waving_hand:");
    assert_eq!(hits[0]["rank"], 0);
    assert_eq!(hits[1]["rank"], 1);
    assert!(hits[0].get("similarity").is_some());
}

#[test]
fn unknown_word_is_not_an_error() {
    let dir = build_store();

    emoji_search(dir.path())
        .args(["search", "xylophone"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No emoji found"));
    assert!(search_json(dir.path(), &["xylophone"]).is_empty());
}

#[test]
fn search_applies_variant_preference() {
    let dir = build_store();

    let hits = search_json(dir.path(), &["coder", "--skin-tone", "dark", "--gender", "woman"]);
    let labels: Vec<&str> = hits.iter().map(|h| h["label"].as_str().unwrap()).collect();
    assert_eq!(
        labels,
        vec![
            ":waving_hand_dark_skin_tone:",
            ":woman_technologist:",
            ":flower:"
        ]
    );
    assert_eq!(hits[1]["rank"], 1);
}

#[test]
fn live_search_uses_stored_vectors() {
    let dir = build_store();

    let hits = search_json(dir.path(), &["anything at all", "--live", "dummy", "--limit", "2"]);
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0]["label"], ":waving_hand:");
}

#[test]
fn variants_lists_skin_tones() {
    let dir = build_store();

    emoji_search(dir.path())
        .args(["variants", ":waving_hand:"])
        .assert()
        .success()
        .stdout(predicate::str::contains(":waving_hand_light_skin_tone:"))
        .stdout(predicate::str::contains(":waving_hand_dark_skin_tone:"));

    emoji_search(dir.path())
        .args(["variants", ":flower:"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has no variants"));
}

#[test]
fn info_prints_metadata() {
    let dir = build_store();

    emoji_search(dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("model"))
        .stdout(predicate::str::contains("dummy"))
        .stdout(predicate::str::contains("corpus_fingerprint"))
        .stdout(predicate::str::contains("3 vocabulary words"));

    let output = emoji_search(dir.path())
        .args(["--format", "json", "info"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let info: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(info["vocabulary_size"], "3");
    assert_eq!(info["model"], "dummy");
}

#[test]
fn search_without_store_fails() {
    let dir = TempDir::new().unwrap();

    emoji_search(dir.path())
        .args(["search", "hello"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("main.db"));
}

#[test]
fn completions_are_generated() {
    let dir = TempDir::new().unwrap();

    emoji_search(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("emoji-search"));
}
