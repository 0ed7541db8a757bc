use std::{collections::HashSet, sync::Arc, time::Duration};

use futures::future::BoxFuture;

use crate::error::SimilarityError;

/// Something that scores how alike two texts are, from 0 (nothing in
/// common) to 1 (the same). Must give the same score both ways around.
pub trait TextComparator: Send + Sync {
    fn similarity<'a>(&'a self, a: &'a str, b: &'a str) -> BoxFuture<'a, Result<f64, SimilarityError>>;
}

/// Compares texts by their character trigrams, after throwing away
/// case, punctuation, whitespace, and which digits were used.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShingleComparator;

impl ShingleComparator {
    pub fn score(a: &str, b: &str) -> f64 {
        let a = squash(a);
        let b = squash(b);
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let a = shingles(&a);
        let b = shingles(&b);
        let common = a.intersection(&b).count();
        let total = a.union(&b).count();
        common as f64 / total as f64
    }
}

impl TextComparator for ShingleComparator {
    fn similarity<'a>(&'a self, a: &'a str, b: &'a str) -> BoxFuture<'a, Result<f64, SimilarityError>> {
        Box::pin(async move { Ok(Self::score(a, b)) })
    }
}

/// Lowercase letters and digits only, with every digit turned into `0`.
fn squash(text: &str) -> Vec<char> {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .map(|c| match c {
            c if c.is_numeric() => '0',
            'ё' => 'е',
            c => c,
        })
        .collect()
}

fn shingles(chars: &[char]) -> HashSet<&[char]> {
    if chars.len() < 3 {
        return HashSet::from([chars]);
    }
    chars.windows(3).collect()
}

/// Tells whether a submission is a cosmetic edit of the previous one.
pub struct SimilarityDetector {
    comparator: Arc<dyn TextComparator>,
    threshold: f64,
    timeout: Duration,
}

impl SimilarityDetector {
    pub fn new(comparator: Arc<dyn TextComparator>, threshold: f64, timeout: Duration) -> Self {
        SimilarityDetector {
            comparator,
            threshold,
            timeout,
        }
    }

    /// `true` if the texts are at least as similar as the threshold.
    /// A comparison that fails or takes too long counts as "not similar".
    pub async fn are_similar(&self, old_text: &str, new_text: &str) -> bool {
        let comparison = tokio::time::timeout(
            self.timeout,
            self.comparator.similarity(old_text, new_text),
        )
        .await
        .unwrap_or(Err(SimilarityError::Timeout));

        match comparison {
            Ok(score) => score >= self.threshold,
            Err(e) => {
                log::debug!("Treating texts as not similar: {e}");
                false
            }
        }
    }
}
