//! Word list matching.
//!
//! Text is lowercased and cut into runs of letters; everything else counts
//! as a word boundary. The words are then joined back with single spaces,
//! and word list entries go through the exact same treatment, so
//! `"Avito.ru"` in a list matches `"avito ru"`, `"AVITO-RU"` and so on.
//!
//! Profanity and long stop words match anywhere in that joined text, even
//! in the middle of a word. Short stop words have to line up with whole
//! words. A white list entry cancels a match if it lines up with whole words
//! and covers the matched text.

use std::ops::Range;

use crate::{
    types::{CategorySet, MatchedWord},
    word_lists::WordListSnapshot,
};

/// Text reduced to lowercase words separated by single spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
}

impl NormalizedText {
    pub fn new(input: &str) -> Self {
        let mut text = String::with_capacity(input.len());
        let mut in_word = false;

        for c in input.chars().flat_map(char::to_lowercase) {
            if c.is_alphabetic() {
                if !in_word && !text.is_empty() {
                    text.push(' ');
                }
                in_word = true;
                text.push(match c {
                    'ё' => 'е',
                    c => c,
                });
            } else {
                in_word = false;
            }
        }

        NormalizedText { text }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Whether `range` starts and ends on word boundaries.
    fn is_word_aligned(&self, range: &Range<usize>) -> bool {
        let bytes = self.text.as_bytes();
        (range.start == 0 || bytes[range.start - 1] == b' ')
            && (range.end == bytes.len() || bytes[range.end] == b' ')
    }

    /// Widen `range` to the whole words it touches.
    fn widen_to_words(&self, range: &Range<usize>) -> Range<usize> {
        let start = self.text[..range.start]
            .rfind(' ')
            .map_or(0, |space| space + 1);
        let end = self.text[range.end..]
            .find(' ')
            .map_or(self.text.len(), |space| range.end + space);
        start..end
    }

    /// Every occurrence of `needle`, overlapping ones included.
    fn occurrences<'a>(&'a self, needle: &'a str) -> impl Iterator<Item = Range<usize>> + 'a {
        let mut from = 0;
        std::iter::from_fn(move || {
            if needle.is_empty() || from > self.text.len() {
                return None;
            }
            let start = from + self.text[from..].find(needle)?;
            // Step over one character, not one byte.
            from = start
                + self.text[start..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
            Some(start..start + needle.len())
        })
    }
}

/// How a word list is matched against text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchRule {
    /// Anywhere, including the middle of a word.
    Substring,
    /// Only whole words.
    WholeWords,
}

/// Check `text` against the word lists in `categories`.
///
/// Profanity is checked first, then long stop words, then short ones. The
/// first match wins regardless of where it is in the text.
pub fn classify(
    text: &str,
    lists: &WordListSnapshot,
    categories: &CategorySet,
) -> Option<MatchedWord> {
    let normalized = NormalizedText::new(text);
    if normalized.is_empty() {
        return None;
    }

    let white = lists.words(categories.white);

    let order = [
        (categories.profanity, MatchRule::Substring),
        (categories.long, MatchRule::Substring),
        (categories.short, MatchRule::WholeWords),
    ];

    for (category, rule) in order {
        for word in lists.words(category) {
            if let Some(found) = find_unexcused(&normalized, word, rule, white) {
                return Some(MatchedWord {
                    category,
                    word: word.clone(),
                    found_in: normalized.as_str()[normalized.widen_to_words(&found)].to_string(),
                });
            }
        }
    }

    None
}

/// First occurrence of `word` that obeys `rule` and isn't covered by the
/// white list.
fn find_unexcused(
    text: &NormalizedText,
    word: &str,
    rule: MatchRule,
    white: &[String],
) -> Option<Range<usize>> {
    text.occurrences(word)
        .filter(|found| rule == MatchRule::Substring || text.is_word_aligned(found))
        .find(|found| !is_whitelisted(text, found, white))
}

fn is_whitelisted(text: &NormalizedText, found: &Range<usize>, white: &[String]) -> bool {
    white.iter().any(|exception| {
        text.occurrences(exception).any(|covering| {
            text.is_word_aligned(&covering)
                && covering.start <= found.start
                && covering.end >= found.end
        })
    })
}
