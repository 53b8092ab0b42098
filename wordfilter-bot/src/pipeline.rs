//! Per-message moderation stage
//!
//! Every inbound message not written by a bot is evaluated against the
//! current filter snapshot. A match asks the platform to delete the message;
//! a failed deletion is logged and counted and never stops later messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wordfilter_core::{FilterScope, FilterState, MatchResult, PrincipalId};

use crate::error::DeliveryError;

/// A chat message as delivered by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: u64,
    #[serde(default)]
    pub channel_id: u64,
    pub author: PrincipalId,
    #[serde(default)]
    pub author_is_bot: bool,
    pub content: String,
}

/// Side effects the pipeline asks the chat platform to perform.
#[async_trait]
pub trait MessageActions: Send + Sync {
    async fn delete_message(
        &self,
        message: &InboundMessage,
        result: &MatchResult,
    ) -> Result<(), DeliveryError>;
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Bot-authored (or our own) message, not evaluated
    Ignored,
    Allowed,
    Deleted {
        word: String,
        scope: FilterScope,
    },
    DeleteFailed {
        word: String,
        scope: FilterScope,
        error: String,
    },
}

impl Outcome {
    /// Whether processing of this message should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outcome::Deleted { .. } | Outcome::DeleteFailed { .. })
    }
}

/// Counters since startup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    pub messages_seen: u64,
    pub messages_ignored: u64,
    pub messages_deleted: u64,
    pub delete_failures: u64,
}

/// Moderation stage shared by all concurrent message tasks.
pub struct ModerationPipeline {
    state: Arc<FilterState>,
    actions: Arc<dyn MessageActions>,
    self_id: Option<PrincipalId>,
    messages_seen: AtomicU64,
    messages_ignored: AtomicU64,
    messages_deleted: AtomicU64,
    delete_failures: AtomicU64,
}

impl ModerationPipeline {
    pub fn new(
        state: Arc<FilterState>,
        actions: Arc<dyn MessageActions>,
        self_id: Option<PrincipalId>,
    ) -> Self {
        Self {
            state,
            actions,
            self_id,
            messages_seen: AtomicU64::new(0),
            messages_ignored: AtomicU64::new(0),
            messages_deleted: AtomicU64::new(0),
            delete_failures: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> &Arc<FilterState> {
        &self.state
    }

    /// Evaluate one message and carry out the deletion if it matches.
    pub async fn process(&self, message: &InboundMessage) -> Outcome {
        self.messages_seen.fetch_add(1, Ordering::Relaxed);

        if message.author_is_bot || Some(message.author) == self.self_id {
            self.messages_ignored.fetch_add(1, Ordering::Relaxed);
            return Outcome::Ignored;
        }

        let result = self.state.evaluate(&message.content, message.author);
        let (Some(word), Some(scope)) = (result.matched_word.clone(), result.scope) else {
            debug!(message_id = message.id, "Message allowed");
            return Outcome::Allowed;
        };

        match self.actions.delete_message(message, &result).await {
            Ok(()) => {
                self.messages_deleted.fetch_add(1, Ordering::Relaxed);
                info!(
                    message_id = message.id,
                    author = %message.author,
                    word = %word,
                    scope = ?scope,
                    "Deleted filtered message"
                );
                Outcome::Deleted { word, scope }
            }
            Err(e) => {
                self.delete_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    message_id = message.id,
                    author = %message.author,
                    word = %word,
                    error = %e,
                    "Failed to delete filtered message"
                );
                Outcome::DeleteFailed {
                    word,
                    scope,
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            messages_seen: self.messages_seen.load(Ordering::Relaxed),
            messages_ignored: self.messages_ignored.load(Ordering::Relaxed),
            messages_deleted: self.messages_deleted.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use wordfilter_core::SimilarityThreshold;

    /// Records deletions; fails for message ids listed in `fail_ids`.
    #[derive(Default)]
    struct RecordingActions {
        deleted: Mutex<Vec<u64>>,
        fail_ids: Vec<u64>,
    }

    #[async_trait]
    impl MessageActions for RecordingActions {
        async fn delete_message(
            &self,
            message: &InboundMessage,
            _result: &MatchResult,
        ) -> Result<(), DeliveryError> {
            if self.fail_ids.contains(&message.id) {
                return Err(DeliveryError::Forbidden("manage_messages".to_string()));
            }
            self.deleted.lock().unwrap().push(message.id);
            Ok(())
        }
    }

    fn message(id: u64, author: u64, content: &str) -> InboundMessage {
        InboundMessage {
            id,
            channel_id: 1,
            author: PrincipalId(author),
            author_is_bot: false,
            content: content.to_string(),
        }
    }

    fn pipeline(actions: Arc<RecordingActions>) -> ModerationPipeline {
        let state = Arc::new(FilterState::with_words(
            ["spam"],
            SimilarityThreshold::default(),
        ));
        ModerationPipeline::new(state, actions, Some(PrincipalId(999)))
    }

    #[tokio::test]
    async fn test_matching_message_is_deleted() {
        let actions = Arc::new(RecordingActions::default());
        let pipeline = pipeline(actions.clone());

        let outcome = pipeline.process(&message(10, 1, "buy SPAM now")).await;
        assert_eq!(
            outcome,
            Outcome::Deleted {
                word: "spam".to_string(),
                scope: FilterScope::Global
            }
        );
        assert!(outcome.is_terminal());
        assert_eq!(*actions.deleted.lock().unwrap(), vec![10]);
    }

    #[tokio::test]
    async fn test_clean_message_is_allowed() {
        let actions = Arc::new(RecordingActions::default());
        let pipeline = pipeline(actions.clone());

        let outcome = pipeline.process(&message(11, 1, "hello there")).await;
        assert_eq!(outcome, Outcome::Allowed);
        assert!(!outcome.is_terminal());
        assert!(actions.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bot_and_self_messages_are_ignored() {
        let actions = Arc::new(RecordingActions::default());
        let pipeline = pipeline(actions.clone());

        let mut from_bot = message(12, 1, "spam");
        from_bot.author_is_bot = true;
        assert_eq!(pipeline.process(&from_bot).await, Outcome::Ignored);
        assert_eq!(pipeline.process(&message(13, 999, "spam")).await, Outcome::Ignored);
        assert!(actions.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_does_not_stop_later_messages() {
        let actions = Arc::new(RecordingActions {
            fail_ids: vec![20],
            ..Default::default()
        });
        let pipeline = pipeline(actions.clone());

        let failed = pipeline.process(&message(20, 1, "spam")).await;
        assert!(matches!(failed, Outcome::DeleteFailed { .. }));

        let next = pipeline.process(&message(21, 1, "spam")).await;
        assert!(matches!(next, Outcome::Deleted { .. }));
        assert_eq!(pipeline.state().global().to_strings(), vec!["spam"]);

        assert_eq!(
            pipeline.stats(),
            PipelineStats {
                messages_seen: 2,
                messages_ignored: 0,
                messages_deleted: 1,
                delete_failures: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_config_changes_apply_to_next_message() {
        let actions = Arc::new(RecordingActions::default());
        let pipeline = pipeline(actions.clone());

        pipeline.state().set_user(PrincipalId(42), ["foo"]);
        assert!(pipeline.process(&message(30, 42, "foo")).await.is_terminal());
        assert_eq!(pipeline.process(&message(31, 99, "foo")).await, Outcome::Allowed);

        pipeline.state().clear_global();
        assert_eq!(pipeline.process(&message(32, 1, "spam")).await, Outcome::Allowed);
    }
}
