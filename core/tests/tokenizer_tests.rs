use subtagger_core::tokenizer::{normalize, tokenize};

#[test]
fn it_normalizes_and_stems() {
    let words = tokenize("Running Runners RUN!");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
}

#[test]
fn it_filters_stopwords() {
    let words = tokenize("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
}

#[test]
fn identical_meaning_identical_key() {
    // dedup key must be insensitive to case, punctuation and spacing
    assert_eq!(normalize("Dogs bark!"), normalize("  dogs   BARK  "));
}
