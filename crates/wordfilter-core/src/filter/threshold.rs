//! Similarity threshold

use std::fmt;

use serde::Serialize;

use crate::error::{FilterError, FilterResult};

/// Minimum similarity ratio (0-100) an approximate match must reach.
///
/// `0` disables approximate matching; only literal containment applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SimilarityThreshold(u8);

impl SimilarityThreshold {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;
    pub const DEFAULT: u8 = 50;

    /// Validate `value` against `0..=100`.
    pub fn new(value: i64) -> FilterResult<Self> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(FilterError::InvalidThreshold(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_disabled(self) -> bool {
        self.0 == 0
    }
}

impl Default for SimilarityThreshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<i64> for SimilarityThreshold {
    type Error = FilterError;

    fn try_from(value: i64) -> FilterResult<Self> {
        Self::new(value)
    }
}

impl fmt::Display for SimilarityThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
