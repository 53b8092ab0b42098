//! Filter words, block lists and principal identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// A single blocked token or phrase.
///
/// Always trimmed and lower-cased; never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FilterWord(String);

impl FilterWord {
    /// Normalize `raw` into a filter word, or `None` if nothing is left after trimming.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FilterWord {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered collection of filter words under one scope.
///
/// Order decides which word is reported when several could match,
/// never whether a message matches at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BlockList(Vec<FilterWord>);

impl BlockList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Build a list from raw strings, dropping segments that are empty after trimming.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            words
                .into_iter()
                .filter_map(|w| FilterWord::new(w.as_ref()))
                .collect(),
        )
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterWord> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Words as plain strings, in evaluation order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|w| w.0.clone()).collect()
    }

    /// Comma-joined rendering, the inverse of [`split_word_list`].
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(FilterWord::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<'a> IntoIterator for &'a BlockList {
    type Item = &'a FilterWord;
    type IntoIter = std::slice::Iter<'a, FilterWord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for BlockList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_words(iter)
    }
}

/// Split comma-separated user input (`"word1, word2"`) into trimmed, non-empty words.
pub fn split_word_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stable identifier of a message author.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrincipalId(pub u64);

impl PrincipalId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for PrincipalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts a bare id (`123`) or a chat mention (`<@123>`, `<@!123>`).
impl FromStr for PrincipalId {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let inner = trimmed
            .strip_prefix("<@")
            .and_then(|rest| rest.strip_suffix('>'))
            .map(|rest| rest.strip_prefix('!').unwrap_or(rest))
            .unwrap_or(trimmed);

        inner
            .parse::<u64>()
            .map(PrincipalId)
            .map_err(|_| FilterError::InvalidPrincipal(s.to_string()))
    }
}
