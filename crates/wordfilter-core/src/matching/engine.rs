//! MatchEngine - decides whether a message hits a filter word

use serde::Serialize;

use super::similarity::{meets_threshold, similarity_ratio};
use crate::filter::{FilterSnapshot, FilterWord, PrincipalId};

/// Which block list produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterScope {
    Global,
    User,
}

/// How a filter word matched
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MatchStrategy {
    /// Word appears literally in the lower-cased message
    Containment,
    /// A message token reached the similarity threshold
    Similarity { token: String, score: f64 },
}

/// Outcome of evaluating one message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub matched: bool,
    pub matched_word: Option<String>,
    pub scope: Option<FilterScope>,
    pub strategy: Option<MatchStrategy>,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            matched: false,
            matched_word: None,
            scope: None,
            strategy: None,
        }
    }

    fn hit(word: &FilterWord, scope: FilterScope, strategy: MatchStrategy) -> Self {
        Self {
            matched: true,
            matched_word: Some(word.as_str().to_string()),
            scope: Some(scope),
            strategy: Some(strategy),
        }
    }

    pub fn is_match(&self) -> bool {
        self.matched
    }
}

/// Stateless evaluator over a [`FilterSnapshot`].
///
/// Global words are checked first, then the author's own words. The first
/// word that matches wins; candidates are not ranked by score.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchEngine;

impl MatchEngine {
    pub fn evaluate(text: &str, author: PrincipalId, snapshot: &FilterSnapshot) -> MatchResult {
        let text_lower = text.to_lowercase();
        let tokens: Vec<&str> = text_lower.split_whitespace().collect();
        let threshold = snapshot.threshold;

        let global = snapshot.global.iter().map(|w| (w, FilterScope::Global));
        let user = snapshot
            .user_words(author)
            .into_iter()
            .flatten()
            .map(|w| (w, FilterScope::User));

        for (word, scope) in global.chain(user) {
            if let Some(strategy) =
                Self::match_word(&text_lower, &tokens, word, threshold.get())
            {
                return MatchResult::hit(word, scope, strategy);
            }
        }

        MatchResult::no_match()
    }

    /// Containment first; similarity only when the threshold is non-zero.
    fn match_word(
        text_lower: &str,
        tokens: &[&str],
        word: &FilterWord,
        threshold: u8,
    ) -> Option<MatchStrategy> {
        let pattern = word.as_str();

        if text_lower.contains(pattern) {
            return Some(MatchStrategy::Containment);
        }

        if threshold == 0 {
            return None;
        }

        tokens
            .iter()
            .find(|token| meets_threshold(token, pattern, threshold))
            .map(|token| MatchStrategy::Similarity {
                token: (*token).to_string(),
                score: similarity_ratio(token, pattern),
            })
    }
}
