//! Scope-keyed storage of both synchronized items
//!
//! The engine never caches stored state: every operation reads through the
//! store when it starts and again after any prompt it awaits.

use crate::config::Watched;
use crate::error::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use rulesync_core::{Rule, Scope};
use std::collections::HashMap;

/// Persistent store for the rule list and the flattened string of each scope
///
/// Implementations refuse workspace-scope writes while no workspace is open
/// and read an empty rule list / empty string in that case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Whether a workspace is currently open
    fn workspace_open(&self) -> bool;

    /// Read the rule list of a scope (empty when unset)
    async fn read_rules(&self, scope: Scope) -> Result<Vec<Rule>, StoreError>;

    /// Replace the rule list of a scope
    async fn write_rules(&self, scope: Scope, rules: &[Rule]) -> Result<(), StoreError>;

    /// Read the flattened string of a scope (empty when unset)
    async fn read_flattened(&self, scope: Scope) -> Result<String, StoreError>;

    /// Replace the flattened string of a scope
    async fn write_flattened(&self, scope: Scope, text: &str) -> Result<(), StoreError>;
}

/// Whether `scope` can be addressed on `store`
#[inline]
pub fn is_available(store: &dyn ScopeStore, scope: Scope) -> bool {
    scope == Scope::Global || store.workspace_open()
}

#[derive(Debug, Default)]
struct MemoryState {
    workspace_open: bool,
    rules: HashMap<Scope, Vec<Rule>>,
    flattened: HashMap<Scope, String>,
    changes: Vec<(Scope, Watched)>,
}

/// In-process store
///
/// Records every successful write as a pending change so a host loop (or a
/// test) can feed them back to the engine as change notifications.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    /// Create an empty store with no workspace open
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a workspace open
    #[must_use]
    pub fn with_workspace() -> Self {
        let store = Self::new();
        store.set_workspace_open(true);
        store
    }

    /// Open or close the workspace
    pub fn set_workspace_open(&self, open: bool) {
        self.state.lock().workspace_open = open;
    }

    /// Set the rule list without recording a change
    pub fn seed_rules(&self, scope: Scope, rules: Vec<Rule>) {
        self.state.lock().rules.insert(scope, rules);
    }

    /// Set the flattened string without recording a change
    pub fn seed_flattened(&self, scope: Scope, text: impl Into<String>) {
        self.state.lock().flattened.insert(scope, text.into());
    }

    /// Current rule list of a scope
    #[must_use]
    pub fn rules(&self, scope: Scope) -> Vec<Rule> {
        self.state.lock().rules.get(&scope).cloned().unwrap_or_default()
    }

    /// Current flattened string of a scope
    #[must_use]
    pub fn flattened(&self, scope: Scope) -> String {
        self.state
            .lock()
            .flattened
            .get(&scope)
            .cloned()
            .unwrap_or_default()
    }

    /// Take the changes recorded since the last call
    pub fn take_changes(&self) -> Vec<(Scope, Watched)> {
        std::mem::take(&mut self.state.lock().changes)
    }

    fn check_writable(state: &MemoryState, scope: Scope) -> Result<(), StoreError> {
        if scope == Scope::Workspace && !state.workspace_open {
            return Err(StoreError::WorkspaceUnavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl ScopeStore for MemoryStore {
    fn workspace_open(&self) -> bool {
        self.state.lock().workspace_open
    }

    async fn read_rules(&self, scope: Scope) -> Result<Vec<Rule>, StoreError> {
        let state = self.state.lock();
        if scope == Scope::Workspace && !state.workspace_open {
            return Ok(Vec::new());
        }
        Ok(state.rules.get(&scope).cloned().unwrap_or_default())
    }

    async fn write_rules(&self, scope: Scope, rules: &[Rule]) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::check_writable(&state, scope)?;
        state.rules.insert(scope, rules.to_vec());
        state.changes.push((scope, Watched::Rules));
        Ok(())
    }

    async fn read_flattened(&self, scope: Scope) -> Result<String, StoreError> {
        let state = self.state.lock();
        if scope == Scope::Workspace && !state.workspace_open {
            return Ok(String::new());
        }
        Ok(state.flattened.get(&scope).cloned().unwrap_or_default())
    }

    async fn write_flattened(&self, scope: Scope, text: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        Self::check_writable(&state, scope)?;
        state.flattened.insert(scope, text.to_string());
        state.changes.push((scope, Watched::Flattened));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn defaults_are_empty() {
        let store = MemoryStore::new();
        assert!(store.read_rules(Scope::Global).await.unwrap().is_empty());
        assert_eq!(store.read_flattened(Scope::Global).await.unwrap(), "");
    }

    #[tokio::test]
    async fn workspace_refused_when_closed() {
        let store = MemoryStore::new();
        assert!(!is_available(&store, Scope::Workspace));
        let err = store
            .write_flattened(Scope::Workspace, "a: 1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::WorkspaceUnavailable));
    }

    #[tokio::test]
    async fn workspace_reads_empty_when_closed() {
        let store = MemoryStore::with_workspace();
        store.seed_rules(Scope::Workspace, vec![Rule::new(1, "a")]);
        store.set_workspace_open(false);
        assert!(store.read_rules(Scope::Workspace).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_are_recorded_as_changes() {
        let store = MemoryStore::new();
        store.seed_flattened(Scope::Global, "seeded: yes");
        assert!(store.take_changes().is_empty());

        store.write_rules(Scope::Global, &[Rule::new(1, "a")]).await.unwrap();
        store.write_flattened(Scope::Global, "a: 1").await.unwrap();
        assert_eq!(
            store.take_changes(),
            vec![(Scope::Global, Watched::Rules), (Scope::Global, Watched::Flattened)]
        );
        assert!(store.take_changes().is_empty());
    }
}
