//! Message Matching
//!
//! For each candidate word (global list first, then the author's list):
//!
//! 1. Literal containment in the lower-cased message
//! 2. Levenshtein similarity per whitespace token, when the threshold is non-zero
//!
//! The first candidate to match wins.
//!
//! # Example
//!
//! ```rust
//! use wordfilter_core::filter::{FilterState, PrincipalId, SimilarityThreshold};
//!
//! let state = FilterState::with_words(["spam"], SimilarityThreshold::default());
//! let result = state.evaluate("buy SPAM now", PrincipalId(7));
//! assert!(result.matched);
//! assert_eq!(result.matched_word.as_deref(), Some("spam"));
//! ```

mod engine;
mod similarity;

pub use engine::{FilterScope, MatchEngine, MatchResult, MatchStrategy};
pub use similarity::{meets_threshold, similarity_ratio};
