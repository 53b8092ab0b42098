//! Bot configuration
//!
//! Resolved once at startup from CLI flags, which fall back to:
//! - `WORDFILTER_WORDS`: initial global words, comma-separated (default: none)
//! - `WORDFILTER_THRESHOLD`: similarity threshold 0-100 (default: 50)
//! - `WORDFILTER_SELF_ID`: the bot's own author id, never filtered

use wordfilter_core::{split_word_list, FilterState, PrincipalId, SimilarityThreshold};

use crate::error::ConfigError;

/// Startup configuration for the moderation bot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BotConfig {
    /// Seed for the global block list
    pub initial_words: Vec<String>,
    pub threshold: SimilarityThreshold,
    /// Messages from this author are never evaluated
    pub self_id: Option<PrincipalId>,
}

impl BotConfig {
    /// Build from raw (string) settings, validating each one.
    pub fn from_raw(
        words: Option<&str>,
        threshold: Option<&str>,
        self_id: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let initial_words = words.map(split_word_list).unwrap_or_default();

        let threshold = match threshold.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let value: i64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    name: "threshold",
                    reason: format!("'{}' is not an integer", raw),
                })?;
                SimilarityThreshold::new(value)?
            }
            None => SimilarityThreshold::default(),
        };

        let self_id = self_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|raw| raw.parse::<PrincipalId>())
            .transpose()?;

        Ok(Self {
            initial_words,
            threshold,
            self_id,
        })
    }

    /// Create the filter state seeded from this configuration.
    pub fn build_state(&self) -> FilterState {
        FilterState::with_words(&self.initial_words, self.threshold)
    }
}
