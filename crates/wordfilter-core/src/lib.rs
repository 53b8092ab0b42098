//! Wordfilter Core Engine
//!
//! The matching engine and filter configuration behind the wordfilter bot.
//! Everything here is synchronous and in-memory; chat-platform I/O lives in
//! the bot crate.
//!
//! # Example
//!
//! ```rust
//! use wordfilter_core::{FilterScope, FilterState, PrincipalId};
//!
//! let state = FilterState::new();
//! state.set_user(PrincipalId(42), ["foo"]);
//!
//! let hit = state.evaluate("this has foo in it", PrincipalId(42));
//! assert_eq!(hit.scope, Some(FilterScope::User));
//!
//! let miss = state.evaluate("this has foo in it", PrincipalId(99));
//! assert!(!miss.matched);
//! ```

pub mod error;
pub mod filter;
pub mod matching;

// Re-export main types at crate root
pub use error::{FilterError, FilterResult};
pub use filter::{
    split_word_list, BlockList, FilterSnapshot, FilterState, FilterWord, PrincipalId,
    SimilarityThreshold,
};
pub use matching::{FilterScope, MatchEngine, MatchResult, MatchStrategy};
