//! Sentiment classifier collaborator.
//!
//! The aggregation core only consumes labels. This module provides the seam
//! the record store calls through, plus a small word-list classifier used when
//! a corpus arrives without precomputed labels.

use std::collections::HashSet;

use crate::models::SentimentLabel;

pub trait Classifier: Send + Sync {
    /// Total and side-effect free: every input maps to exactly one label.
    fn classify(&self, text: &str) -> SentimentLabel;
}

/// Polarity classifier that counts lexicon hits.
pub struct LexiconClassifier {
    positive_words: HashSet<&'static str>,
    negative_words: HashSet<&'static str>,
}

impl Default for LexiconClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconClassifier {
    pub fn new() -> Self {
        Self {
            positive_words: Self::build_positive_lexicon(),
            negative_words: Self::build_negative_lexicon(),
        }
    }

    fn build_positive_lexicon() -> HashSet<&'static str> {
        [
            "thanks", "thank", "great", "good", "excellent", "appreciate", "happy",
            "glad", "congratulations", "congrats", "pleased", "success", "successful",
            "welcome", "wonderful", "helpful", "awesome", "nice", "love", "excited",
            "well", "best", "fantastic", "enjoy", "agree", "perfect", "progress",
        ]
        .into_iter()
        .collect()
    }

    fn build_negative_lexicon() -> HashSet<&'static str> {
        [
            "problem", "issue", "issues", "concern", "concerned", "unfortunately",
            "bad", "wrong", "fail", "failed", "failure", "delay", "delayed", "angry",
            "disappointed", "frustrated", "complaint", "worse", "worst", "unacceptable",
            "sorry", "mistake", "error", "urgent", "risk", "quit", "resign", "upset",
            "terrible", "poor", "cancel", "cancelled", "loss",
        ]
        .into_iter()
        .collect()
    }
}

impl Classifier for LexiconClassifier {
    fn classify(&self, text: &str) -> SentimentLabel {
        let lower = text.to_lowercase();
        let mut positive = 0usize;
        let mut negative = 0usize;

        for word in lower.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            if self.positive_words.contains(word) {
                positive += 1;
            } else if self.negative_words.contains(word) {
                negative += 1;
            }
        }

        match positive.cmp(&negative) {
            std::cmp::Ordering::Greater => SentimentLabel::Positive,
            std::cmp::Ordering::Less => SentimentLabel::Negative,
            std::cmp::Ordering::Equal => SentimentLabel::Neutral,
        }
    }
}
