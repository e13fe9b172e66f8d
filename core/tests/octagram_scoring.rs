// core/tests/octagram_scoring.rs
//
// Collocation scoring against small on-disk grammar databases.
//
// Tests cover:
// - floor score without a database or without context
// - collocation vs weak collocation penalty at the min-length boundary
// - the whole-window exception
// - best-evidence combination across window sizes
// - rear penalty via the "$" boundary key
// - construction through OctagramComponent and a TOML config

use octagram_core::encoding::encode;
use octagram_core::gram_db::{quantize, scale_value};
use octagram_core::{
    DirResourceResolver, GramDb, GrammarComponent, GrammarConfig, Octagram, OctagramComponent,
    TomlConfig, GRAM_DB_TYPE,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

const EPSILON: f64 = 1e-9;

fn write_db(path: &Path, entries: &[(Vec<u8>, f64)]) {
    let mut data = entries.to_vec();
    data.sort_by(|a, b| a.0.cmp(&b.0));
    let mut db = GramDb::new(path);
    db.build(&data).expect("build");
    db.save().expect("save");
}

fn octagram_with(entries: &[(Vec<u8>, f64)], config: GrammarConfig) -> (tempfile::TempDir, Octagram) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.gram");
    write_db(&path, entries);
    let mut db = GramDb::new(&path);
    db.load().expect("load");
    (dir, Octagram::with_db(Some(Arc::new(db)), config))
}

fn gram(text: &str, frequency: f64) -> (Vec<u8>, f64) {
    (encode(text), frequency)
}

fn rear_gram(text: &str, frequency: f64) -> (Vec<u8>, f64) {
    let mut key = encode(text);
    key.push(b'$');
    (key, frequency)
}

fn ln_scaled(frequency: f64) -> f64 {
    scale_value(quantize(frequency))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {}, got {}",
        expected,
        actual
    );
}

#[test]
fn floor_without_db_or_context() {
    let octagram = Octagram::with_db(None, GrammarConfig::default());
    for word in ["的", "东西", ""] {
        assert_eq!(octagram.query("你好", word, false), -12.0);
        assert_eq!(octagram.query("你好", word, true), -12.0);
    }

    let (_dir, octagram) = octagram_with(&[gram("好的", 1e6)], GrammarConfig::default());
    assert_eq!(octagram.query("", "的", false), -12.0);
    assert_eq!(octagram.query("", "的", true), -12.0);
}

#[test]
fn weak_collocation_loses_to_floor() {
    // 好 + 的 from context 你好: collocation_len = 1 + 1 = 2 < 3
    let (_dir, octagram) = octagram_with(&[gram("好的", 100.0)], GrammarConfig::default());
    let score = octagram.query("你好", "的东西", false);
    assert_eq!(score, -12.0, "4.6052 - 24 = -19.3948 must not beat the floor");
}

#[test]
fn min_length_boundary_selects_penalty() {
    let frequency = 1e6;

    let (_dir, octagram) = octagram_with(&[gram("你好的", frequency)], GrammarConfig::default());
    // collocation_len = 2 + 1 = 3
    assert_close(octagram.query("你好", "的东西", false), ln_scaled(frequency) - 12.0);

    let (_dir, octagram) = octagram_with(&[gram("好的", frequency)], GrammarConfig::default());
    // collocation_len = 1 + 1 = 2
    assert_close(octagram.query("你好", "的东西", false), ln_scaled(frequency) - 24.0);
}

#[test]
fn whole_window_match_is_a_full_collocation() {
    let frequency = 1e6;
    let (_dir, octagram) = octagram_with(&[gram("好的", frequency)], GrammarConfig::default());

    // the entire context and the entire word matched
    assert_close(octagram.query("好", "的", false), ln_scaled(frequency) - 12.0);
    // the word window is only partly matched
    assert_close(octagram.query("好", "的东", false), ln_scaled(frequency) - 24.0);
}

#[test]
fn best_candidate_wins() {
    let (_dir, octagram) = octagram_with(
        &[gram("你好的", 1e6), gram("好的", 1e8), gram("好的东", 1e7)],
        GrammarConfig::default(),
    );
    let expected = [
        ln_scaled(1e6) - 12.0, // 你好 + 的
        ln_scaled(1e8) - 24.0, // 好 + 的
        ln_scaled(1e7) - 12.0, // 好 + 的东
    ]
    .into_iter()
    .fold(f64::MIN, f64::max);
    assert_close(octagram.query("你好", "的东西", false), expected);
}

#[test]
fn context_window_is_limited_by_max_length() {
    let entries = [gram("你好的", 1e6)];

    let config = GrammarConfig {
        collocation_max_length: 2,
        ..GrammarConfig::default()
    };
    let (_dir, octagram) = octagram_with(&entries, config);
    // window of one character: 你 falls outside
    assert_eq!(octagram.query("你好", "的", false), -12.0);

    let (_dir, octagram) = octagram_with(&entries, GrammarConfig::default());
    assert_close(octagram.query("我你好", "的", false), ln_scaled(1e6) - 12.0);
}

#[test]
fn rear_penalty_applies_to_whole_words() {
    let (_dir, octagram) = octagram_with(
        &[rear_gram("东", 1e4), rear_gram("东西南", 1e4)],
        GrammarConfig::default(),
    );

    assert_close(octagram.query("买", "东", true), ln_scaled(1e4) - 18.0);
    assert_eq!(octagram.query("买", "东", false), -12.0);
    assert_close(octagram.query("买", "东西南", true), ln_scaled(1e4) - 18.0);
    // truncated to 东西南: not phrase-final evidence
    assert_eq!(octagram.query("买", "东西南北", true), -12.0);
}

#[test]
fn weak_rear_evidence_keeps_floor() {
    // ln(50) - 18 = -14.088 < -12
    let (_dir, octagram) = octagram_with(&[rear_gram("东", 50.0)], GrammarConfig::default());
    assert_eq!(octagram.query("买", "东", true), -12.0);
}

#[test]
fn rear_ignores_bare_word_key() {
    // 东 alone is a key, but only 东$ is boundary evidence
    let (_dir, octagram) = octagram_with(
        &[gram("东", 1e8), rear_gram("东", 1e4)],
        GrammarConfig::default(),
    );
    assert_close(octagram.query("买", "东", true), ln_scaled(1e4) - 18.0);
}

#[test]
fn component_binds_language_from_config() {
    let dir = tempdir().unwrap();
    write_db(&dir.path().join("zh-hant.gram"), &[gram("好的", 1e6)]);
    let component = OctagramComponent::new(Box::new(DirResourceResolver::new(
        GRAM_DB_TYPE,
        dir.path(),
    )));

    let config = TomlConfig::from_toml_str(
        r#"
        [grammar]
        language = "zh-hant"
        collocation_min_length = 2
        collocation_penalty = -10
        "#,
    )
    .unwrap();
    let grammar = component.create(Some(&config));
    assert_close(grammar.query("你好", "的东西", false), ln_scaled(1e6) - 10.0);

    // a second session shares the loaded database
    let again = Octagram::new(Some(&config), &component);
    assert!(again.has_db());
    assert_eq!(component.registry().len(), 1);
}

#[test]
fn component_without_language_or_db_degrades() {
    let dir = tempdir().unwrap();
    write_db(&dir.path().join("zh-hant.gram"), &[gram("好的", 1e6)]);
    let component = OctagramComponent::new(Box::new(DirResourceResolver::new(
        GRAM_DB_TYPE,
        dir.path(),
    )));

    let no_language = TomlConfig::from_toml_str("[grammar]\nrear_penalty = -1\n").unwrap();
    let octagram = Octagram::new(Some(&no_language), &component);
    assert!(!octagram.has_db());
    assert_eq!(octagram.config(), &GrammarConfig::default());
    assert_eq!(octagram.query("好", "的", false), -12.0);

    let missing = TomlConfig::from_toml_str(
        "[grammar]\nlanguage = \"zh-hans\"\nnon_collocation_penalty = -15\n",
    )
    .unwrap();
    let octagram = Octagram::new(Some(&missing), &component);
    assert!(!octagram.has_db());
    assert_eq!(octagram.query("好", "的", false), -15.0);

    assert_eq!(component.create(None).query("好", "的", false), -12.0);
}
