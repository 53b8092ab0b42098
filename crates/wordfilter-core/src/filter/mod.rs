//! Filter configuration
//!
//! - `words` - FilterWord / BlockList normalization and principal ids
//! - `threshold` - validated similarity threshold
//! - `state` - `FilterState`, the shared configuration guarded by a single lock

mod state;
mod threshold;
mod words;

pub use state::{FilterSnapshot, FilterState};
pub use threshold::SimilarityThreshold;
pub use words::{split_word_list, BlockList, FilterWord, PrincipalId};
