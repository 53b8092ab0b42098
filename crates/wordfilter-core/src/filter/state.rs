//! FilterState - shared, mutable filter configuration
//!
//! Readers take an `Arc<FilterSnapshot>` and evaluate against it without
//! holding any lock. Writers copy-on-write a new snapshot under the write
//! lock, so a reader sees either the whole old configuration or the whole
//! new one.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHasher;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::threshold::SimilarityThreshold;
use super::words::{BlockList, PrincipalId};
use crate::error::FilterResult;
use crate::matching::{MatchEngine, MatchResult};

/// One consistent view of the filter configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterSnapshot {
    pub global: BlockList,
    pub users: BTreeMap<PrincipalId, BlockList>,
    pub threshold: SimilarityThreshold,
    /// Number of mutations applied before this snapshot was published
    pub revision: u64,
}

impl FilterSnapshot {
    /// Per-principal words, or `None` when no entry exists.
    pub fn user_words(&self, principal: PrincipalId) -> Option<&BlockList> {
        self.users.get(&principal)
    }

    /// Content hash of the rules (revision excluded), as 16 hex digits.
    pub fn fingerprint(&self) -> String {
        let mut hasher = AHasher::default();
        self.global.hash(&mut hasher);
        self.users.hash(&mut hasher);
        self.threshold.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

/// Thread-safe owner of the filter configuration for one conversational space.
#[derive(Debug, Default)]
pub struct FilterState {
    inner: RwLock<Arc<FilterSnapshot>>,
}

impl FilterState {
    /// Empty global list, no per-principal entries, default threshold
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the global list and threshold at startup.
    pub fn with_words<I, S>(words: I, threshold: SimilarityThreshold) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let snapshot = FilterSnapshot {
            global: BlockList::from_words(words),
            threshold,
            ..Default::default()
        };
        Self {
            inner: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Current configuration. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<FilterSnapshot> {
        Arc::clone(&*self.inner.read())
    }

    /// Evaluate a message against the current configuration.
    pub fn evaluate(&self, text: &str, author: PrincipalId) -> MatchResult {
        let snapshot = self.snapshot();
        MatchEngine::evaluate(text, author, &snapshot)
    }

    fn mutate<R>(&self, op: &'static str, f: impl FnOnce(&mut FilterSnapshot) -> R) -> R {
        let mut guard = self.inner.write();
        let next = Arc::make_mut(&mut *guard);
        let result = f(next);
        next.revision += 1;
        debug!(op, revision = next.revision, "filter configuration updated");
        result
    }

    /// Replace the global list wholesale.
    pub fn set_global<I, S>(&self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = BlockList::from_words(words);
        self.mutate("set_global", move |s| s.global = list);
    }

    pub fn global(&self) -> BlockList {
        self.inner.read().global.clone()
    }

    pub fn clear_global(&self) {
        self.mutate("clear_global", |s| s.global = BlockList::new());
    }

    /// Replace (or create) one principal's list wholesale.
    ///
    /// An empty list is stored as an explicit entry, distinct from no entry.
    pub fn set_user<I, S>(&self, principal: PrincipalId, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let list = BlockList::from_words(words);
        self.mutate("set_user", move |s| {
            s.users.insert(principal, list);
        });
    }

    /// Stored list for `principal`, or an empty list when absent.
    pub fn user(&self, principal: PrincipalId) -> BlockList {
        self.inner
            .read()
            .users
            .get(&principal)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_user(&self, principal: PrincipalId) -> bool {
        self.inner.read().users.contains_key(&principal)
    }

    /// All per-principal entries, ordered by principal id.
    pub fn users(&self) -> Vec<(PrincipalId, BlockList)> {
        self.inner
            .read()
            .users
            .iter()
            .map(|(id, list)| (*id, list.clone()))
            .collect()
    }

    /// Remove one principal's entry. Returns whether an entry existed.
    pub fn clear_user(&self, principal: PrincipalId) -> bool {
        !self.clear_users(&[principal]).is_empty()
    }

    /// Remove several entries at once; returns the ids that had one.
    pub fn clear_users(&self, principals: &[PrincipalId]) -> Vec<PrincipalId> {
        let mut guard = self.inner.write();
        if !principals.iter().any(|p| guard.users.contains_key(p)) {
            return Vec::new();
        }

        let next = Arc::make_mut(&mut *guard);
        let removed: Vec<PrincipalId> = principals
            .iter()
            .filter(|p| next.users.remove(*p).is_some())
            .copied()
            .collect();
        next.revision += 1;
        debug!(
            op = "clear_users",
            removed = removed.len(),
            revision = next.revision,
            "filter configuration updated"
        );
        removed
    }

    pub fn clear_all_users(&self) {
        self.mutate("clear_all_users", |s| s.users.clear());
    }

    /// Set the similarity threshold. Out-of-range values leave the state unchanged.
    pub fn set_threshold(&self, value: i64) -> FilterResult<()> {
        let threshold = SimilarityThreshold::new(value)?;
        self.mutate("set_threshold", move |s| s.threshold = threshold);
        Ok(())
    }

    pub fn threshold(&self) -> SimilarityThreshold {
        self.inner.read().threshold
    }

    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    pub fn fingerprint(&self) -> String {
        self.inner.read().fingerprint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_get_global() {
        let state = FilterState::new();
        state.set_global(["Spam", " eggs ", ""]);
        assert_eq!(state.global().to_strings(), vec!["spam", "eggs"]);
    }

    #[test]
    fn test_set_global_replaces_wholesale() {
        let state = FilterState::with_words(["a", "b"], SimilarityThreshold::default());
        state.set_global(["c"]);
        assert_eq!(state.global().to_strings(), vec!["c"]);
    }

    #[test]
    fn test_clear_global() {
        let state = FilterState::with_words(["a"], SimilarityThreshold::default());
        state.clear_global();
        assert!(state.global().is_empty());
    }

    #[test]
    fn test_user_absent_returns_empty() {
        let state = FilterState::new();
        assert!(state.user(PrincipalId(1)).is_empty());
        assert!(!state.has_user(PrincipalId(1)));
    }

    #[test]
    fn test_user_configured_empty_is_distinct_from_absent() {
        let state = FilterState::new();
        state.set_user(PrincipalId(1), Vec::<String>::new());
        assert!(state.has_user(PrincipalId(1)));
        assert!(state.user(PrincipalId(1)).is_empty());
        assert_eq!(state.users().len(), 1);
    }

    #[test]
    fn test_clear_user_reports_existence() {
        let state = FilterState::new();
        state.set_user(PrincipalId(1), ["foo"]);
        assert!(state.clear_user(PrincipalId(1)));
        assert!(!state.clear_user(PrincipalId(1)));
    }

    #[test]
    fn test_clear_users_returns_removed_only() {
        let state = FilterState::new();
        state.set_user(PrincipalId(1), ["a"]);
        state.set_user(PrincipalId(3), ["c"]);
        let removed = state.clear_users(&[PrincipalId(1), PrincipalId(2), PrincipalId(3)]);
        assert_eq!(removed, vec![PrincipalId(1), PrincipalId(3)]);
        assert!(state.users().is_empty());
    }

    #[test]
    fn test_clear_all_users() {
        let state = FilterState::new();
        state.set_user(PrincipalId(1), ["a"]);
        state.set_user(PrincipalId(2), ["b"]);
        state.clear_all_users();
        assert!(state.users().is_empty());
    }

    #[test]
    fn test_users_sorted_by_id() {
        let state = FilterState::new();
        state.set_user(PrincipalId(9), ["x"]);
        state.set_user(PrincipalId(2), ["y"]);
        let ids: Vec<u64> = state.users().iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn test_threshold_rejection_leaves_prior_value() {
        let state = FilterState::new();
        state.set_threshold(70).unwrap();
        assert_eq!(
            state.set_threshold(150),
            Err(FilterError::InvalidThreshold(150))
        );
        assert_eq!(state.threshold().get(), 70);
    }

    #[test]
    fn test_revision_counts_applied_mutations() {
        let state = FilterState::new();
        assert_eq!(state.revision(), 0);
        state.set_global(["a"]);
        state.set_threshold(10).unwrap();
        let _ = state.set_threshold(-5);
        assert!(!state.clear_user(PrincipalId(4)));
        assert_eq!(state.revision(), 2);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let state = FilterState::with_words(["old"], SimilarityThreshold::default());
        let before = state.snapshot();
        state.set_global(["new"]);
        assert_eq!(before.global.to_strings(), vec!["old"]);
        assert_eq!(state.snapshot().global.to_strings(), vec!["new"]);
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = FilterState::with_words(["x"], SimilarityThreshold::default());
        let b = FilterState::with_words(["x"], SimilarityThreshold::default());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 16);

        b.set_global(["y"]);
        assert_ne!(a.fingerprint(), b.fingerprint());
        b.set_global(["x"]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
