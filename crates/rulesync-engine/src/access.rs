//! Store access shared by the reconciler, the engine and the command layer
//!
//! Every read goes to the store. Store failures are logged and shown to the
//! user right where they happen, then returned as [`SyncError::Store`].

use crate::error::{StoreError, SyncError, SyncResult};
use crate::prompt::{Prompter, Severity};
use crate::store::{self, ScopeStore};
use rulesync_core::{Repaired, Rule, Scope};
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct StoreAccess {
    store: Arc<dyn ScopeStore>,
    prompter: Arc<dyn Prompter>,
}

impl StoreAccess {
    pub(crate) fn new(store: Arc<dyn ScopeStore>, prompter: Arc<dyn Prompter>) -> Self {
        Self { store, prompter }
    }

    pub(crate) fn store(&self) -> &Arc<dyn ScopeStore> {
        &self.store
    }

    pub(crate) fn prompter(&self) -> &Arc<dyn Prompter> {
        &self.prompter
    }

    pub(crate) fn is_available(&self, scope: Scope) -> bool {
        store::is_available(self.store.as_ref(), scope)
    }

    pub(crate) fn ensure_available(&self, scope: Scope) -> SyncResult<()> {
        if self.is_available(scope) {
            Ok(())
        } else {
            Err(SyncError::ScopeUnavailable(scope))
        }
    }

    pub(crate) async fn rules(&self, scope: Scope) -> SyncResult<Vec<Rule>> {
        self.store
            .read_rules(scope)
            .await
            .map_err(|e| self.report("read the rule list", scope, e))
    }

    pub(crate) async fn flattened(&self, scope: Scope) -> SyncResult<String> {
        self.store
            .read_flattened(scope)
            .await
            .map_err(|e| self.report("read the flattened string", scope, e))
    }

    pub(crate) async fn save_rules(&self, scope: Scope, rules: &[Rule]) -> SyncResult<()> {
        self.store
            .write_rules(scope, rules)
            .await
            .map_err(|e| self.report("write the rule list", scope, e))?;
        tracing::debug!(%scope, rules = rules.len(), "rule list written");
        Ok(())
    }

    pub(crate) async fn save_flattened(&self, scope: Scope, text: &str) -> SyncResult<()> {
        self.store
            .write_flattened(scope, text)
            .await
            .map_err(|e| self.report("write the flattened string", scope, e))?;
        tracing::debug!(%scope, bytes = text.len(), "flattened string written");
        Ok(())
    }

    pub(crate) fn warn_repaired(&self, scope: Scope, repaired: &Repaired) {
        let summary = repaired.summary();
        tracing::warn!(%scope, %summary, "repaired rule list");
        self.prompter.notify(
            Severity::Warning,
            &format!("Repaired {scope} rules: {summary}"),
        );
    }

    fn report(&self, action: &str, scope: Scope, error: StoreError) -> SyncError {
        tracing::error!(%scope, %error, "failed to {action}");
        self.prompter.notify(
            Severity::Error,
            &format!("Failed to {action} of the {scope} scope: {error}"),
        );
        SyncError::Store(error)
    }
}

impl fmt::Debug for StoreAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAccess")
            .field("workspace_open", &self.store.workspace_open())
            .finish_non_exhaustive()
    }
}
