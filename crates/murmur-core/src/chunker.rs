//! Text splitting for low time-to-first-audio.
//!
//! The first unit is a short preview cut at the first full stop within the
//! preview budget (or hard-cut at the budget). The rest of the text is packed
//! sentence by sentence into units no larger than the current maximum unit
//! size, which the tuning controller adjusts between synthesis calls.

use std::sync::Arc;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::tuning::TuningController;
use crate::types::TextUnit;

const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];
const SENTENCE_JOINER: &str = ". ";

/// Splits text into ordered units.
#[derive(Debug, Clone)]
pub struct Chunker {
    preview_chars: usize,
    tuning: Arc<TuningController>,
}

impl Chunker {
    pub fn new(preview_chars: usize, tuning: Arc<TuningController>) -> Self {
        Self {
            preview_chars,
            tuning,
        }
    }

    pub fn from_config(config: &SpeechConfig, tuning: Arc<TuningController>) -> Self {
        Self::new(config.preview_chars, tuning)
    }

    /// Split `text` using the current maximum unit size.
    pub fn split(&self, text: &str) -> Vec<TextUnit> {
        let max_unit_chars = self.tuning.max_unit_chars();
        let units = split_text(text, self.preview_chars, max_unit_chars);
        debug!(
            "Split {} chars into {} units (max unit {} chars)",
            text.chars().count(),
            units.len(),
            max_unit_chars
        );
        units
    }
}

/// Split `text` into a preview unit followed by sentence-packed units.
pub fn split_text(text: &str, preview_chars: usize, max_unit_chars: usize) -> Vec<TextUnit> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let preview_chars = preview_chars.max(1);
    if text.chars().count() <= preview_chars {
        return vec![TextUnit::new(0, text)];
    }

    let budget_end = byte_offset(text, preview_chars);
    // A hard cut keeps the budget exactly, trailing whitespace included.
    let (cut, preview) = match text[..budget_end].find('.') {
        Some(pos) => (pos + 1, &text[..=pos]),
        None => (budget_end, &text[..budget_end]),
    };

    let mut contents = vec![preview.to_string()];
    contents.extend(pack_sentences(&text[cut..], max_unit_chars));

    contents
        .into_iter()
        .filter(|c| !c.is_empty())
        .enumerate()
        .map(|(index, content)| TextUnit::new(index, content))
        .collect()
}

/// Greedily pack sentence fragments into units of at most `max_unit_chars`.
fn pack_sentences(text: &str, max_unit_chars: usize) -> Vec<String> {
    // Room for the closing full stop.
    let limit = max_unit_chars.saturating_sub(1).max(1);

    let mut units = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let fragments = text
        .split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|f| !f.is_empty());

    for fragment in fragments {
        let fragment_len = fragment.chars().count();

        if fragment_len > limit {
            close_unit(&mut units, &mut current);
            let mut pieces = wrap_words(fragment, limit);
            let last = pieces.pop().unwrap_or_default();
            // The sentence continues across these pieces, so no full stop.
            units.extend(pieces);
            current_len = last.chars().count();
            current = last;
            continue;
        }

        if current.is_empty() {
            current.push_str(fragment);
            current_len = fragment_len;
        } else if current_len + SENTENCE_JOINER.len() + fragment_len > limit {
            close_unit(&mut units, &mut current);
            current.push_str(fragment);
            current_len = fragment_len;
        } else {
            current.push_str(SENTENCE_JOINER);
            current.push_str(fragment);
            current_len += SENTENCE_JOINER.len() + fragment_len;
        }
    }

    close_unit(&mut units, &mut current);
    units
}

fn close_unit(units: &mut Vec<String>, current: &mut String) {
    if current.is_empty() {
        return;
    }
    let mut unit = std::mem::take(current);
    unit.push('.');
    units.push(unit);
}

/// Break an overlong sentence at whitespace; words longer than `limit`
/// are hard-cut.
fn wrap_words(text: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_len = word.chars().count();

        while word_len > limit {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let split = byte_offset(word, limit);
            pieces.push(word[..split].to_string());
            word = &word[split..];
            word_len -= limit;
        }
        if word.is_empty() {
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len > limit {
            pieces.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        } else {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Byte offset of the `chars`-th character, or the end of the string.
fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(units: &[TextUnit]) -> Vec<&str> {
        units.iter().map(|u| u.content.as_str()).collect()
    }

    #[test]
    fn test_short_text_is_single_preview() {
        let text = "This sentence is exactly fifty characters long ok.";
        assert_eq!(text.chars().count(), 50);

        let units = split_text(text, 200, 2000);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0], TextUnit::new(0, text));
    }

    #[test]
    fn test_preview_ends_at_first_full_stop() {
        let first = format!("{}.", "a".repeat(149));
        let text = format!("{} {}", first, "More words follow here. ".repeat(10));

        let units = split_text(&text, 200, 2000);
        assert_eq!(units[0].content, first);
        assert_eq!(units[0].char_len(), 150);
        assert!(units.len() > 1);
    }

    #[test]
    fn test_preview_hard_cut_without_punctuation() {
        let text = "lorem ipsum ".repeat(30);
        let units = split_text(&text, 200, 2000);

        let expected: String = text.chars().take(200).collect();
        assert_eq!(units[0].content, expected);
        assert!(units[1].content.starts_with("sum lorem"));
        assert!(units[1].content.ends_with('.'));
    }

    #[test]
    fn test_hard_cut_preview_keeps_trailing_space() {
        let text = "abcd ".repeat(60);
        let units = split_text(&text, 200, 2000);

        let expected: String = text.chars().take(200).collect();
        assert!(expected.ends_with(' '));
        assert_eq!(units[0].content, expected);
        assert_eq!(units[0].char_len(), 200);
    }

    #[test]
    fn test_remaining_sentences_are_packed() {
        let text = "Hi. Alpha beta. Gamma delta! Epsilon zeta eta? Theta.";
        let units = split_text(text, 5, 30);

        assert_eq!(
            contents(&units),
            vec!["Hi.", "Alpha beta. Gamma delta.", "Epsilon zeta eta. Theta."]
        );
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.index, i);
            assert!(unit.char_len() <= 30);
        }
    }

    #[test]
    fn test_overlong_sentence_is_wrapped() {
        let text = "Go. one two three four.";
        let units = split_text(text, 3, 10);

        assert_eq!(contents(&units), vec!["Go.", "one two", "three", "four."]);
    }

    #[test]
    fn test_overlong_word_is_hard_cut() {
        let pieces = wrap_words("abcdefghijkl xy", 5);
        assert_eq!(pieces, vec!["abcde", "fghij", "kl xy"]);
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        assert!(split_text("", 200, 2000).is_empty());
        assert!(split_text("   \n\t ", 200, 2000).is_empty());
    }

    #[test]
    fn test_multibyte_text_cuts_on_char_boundary() {
        let text = "é".repeat(300);
        let units = split_text(&text, 200, 2000);
        assert_eq!(units[0].char_len(), 200);
        assert_eq!(units[1].content, format!("{}.", "é".repeat(100)));
    }

    #[test]
    fn test_chunker_follows_tuning() {
        let tuning = Arc::new(TuningController::default());
        let chunker = Chunker::new(10, tuning.clone());
        let text = format!("Intro. {}", "Sentence number here. ".repeat(200));

        let before = chunker.split(&text);
        assert!(before.iter().skip(1).all(|u| u.char_len() <= 2000));

        for _ in 0..3 {
            tuning.record_latency(std::time::Duration::from_millis(200));
        }
        let after = chunker.split(&text);
        assert!(after.len() < before.len());
        assert!(after.iter().skip(1).all(|u| u.char_len() <= 2500));
    }

    #[test]
    fn test_split_is_deterministic() {
        let text = "One. Two three. Four five six. ".repeat(50);
        assert_eq!(split_text(&text, 200, 600), split_text(&text, 200, 600));
    }
}
