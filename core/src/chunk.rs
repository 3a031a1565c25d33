use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Sentence boundary: terminator followed by whitespace.
    static ref SENTENCE_RE: Regex = Regex::new(r"(?s).*?[.!?](\s+|$)|.+$").expect("valid regex");
}

/// Split `text` into chunks of at most `max_tokens` whitespace-separated
/// tokens. Sentences are kept together where possible; a single sentence
/// longer than the budget is hard-split into token windows.
///
/// Any text containing at least one token yields at least one chunk;
/// whitespace-only input yields none. Chunks never overlap.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    let max_tokens = max_tokens.max(1);
    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for sentence in sentences(text) {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if current.len() + words.len() > max_tokens && !current.is_empty() {
            chunks.push(current.join(" "));
            current.clear();
        }
        if words.len() > max_tokens {
            // Oversized sentence: emit fixed token windows.
            for window in words.chunks(max_tokens) {
                if window.len() == max_tokens {
                    chunks.push(window.join(" "));
                } else {
                    current.extend_from_slice(window);
                }
            }
        } else {
            current.extend_from_slice(&words);
        }
    }
    if !current.is_empty() {
        chunks.push(current.join(" "));
    }
    chunks
}

fn sentences(text: &str) -> impl Iterator<Item = &str> {
    SENTENCE_RE.find_iter(text).map(|m| m.as_str().trim()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("A cat sat on the mat.", 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "A cat sat on the mat.");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 100).is_empty());
        assert!(chunk_text("   \n\t ", 100).is_empty());
    }

    #[test]
    fn sentences_pack_up_to_budget() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunks = chunk_text(text, 6);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], "One two three. Four five six.");
        assert_eq!(chunks[1], "Seven eight nine.");
    }

    #[test]
    fn oversized_sentence_is_hard_split() {
        let text = "a b c d e f g h i j";
        let chunks = chunk_text(text, 4);
        assert_eq!(chunks, vec!["a b c d", "e f g h", "i j"]);
        for c in &chunks {
            assert!(c.split_whitespace().count() <= 4);
        }
    }

    #[test]
    fn every_token_survives_chunking() {
        let text = "Alpha beta gamma. Delta epsilon zeta eta theta. Iota kappa.";
        let original: Vec<&str> = text.split_whitespace().collect();
        let chunks = chunk_text(text, 5);
        let rejoined: Vec<String> = chunks
            .iter()
            .flat_map(|c| c.split_whitespace().map(|s| s.to_string()))
            .collect();
        assert_eq!(original.len(), rejoined.len());
    }
}
