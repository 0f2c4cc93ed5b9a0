//! Sync engine
//!
//! Reacts to change notifications for the two watched items of each scope:
//!
//! - rule list changed: repair it, then regenerate the flattened string
//! - flattened string changed: reconcile it against the rule list
//!
//! Writes made here produce change notifications of their own. They settle
//! after one round: the regenerated string matches the rule list, so the
//! follow-up reconcile finds nothing to do.

use crate::access::StoreAccess;
use crate::config::{SyncConfig, Watched};
use crate::error::SyncResult;
use crate::observer::{Observers, RefreshObserver};
use crate::prompt::Prompter;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::store::ScopeStore;
use rulesync_core::{build, parse, repair, Entry, KeyRenames, Parsed, Rule, Scope};
use std::collections::HashMap;
use std::sync::Arc;

/// A watched configuration key changed in a scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    /// Scope the change landed in
    pub scope: Scope,
    /// Configuration key that changed
    pub key: String,
}

impl ChangeEvent {
    /// Create an event
    #[inline]
    #[must_use]
    pub fn new(scope: Scope, key: impl Into<String>) -> Self {
        Self {
            scope,
            key: key.into(),
        }
    }
}

/// Result of regenerating the flattened string from the rule list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Rule list needed repair and was rewritten
    pub repaired: bool,
    /// Keys renamed by repair
    pub renamed: usize,
    /// Rules after repair
    pub rules: usize,
    /// Stored flattened string differed from the regenerated one
    pub text_changed: bool,
}

/// What handling a change event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// Event did not concern a watched key in an addressable scope
    Ignored,
    /// Rule list change handled
    Synced(SyncReport),
    /// Flattened string change handled
    Reconciled(ReconcileOutcome),
}

/// Result of an import offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Rule list created from the flattened string
    Imported {
        /// Rules created
        rules: usize,
    },
    /// Offer declined
    Declined,
    /// Rule list already present, or nothing to import
    NotNeeded,
}

/// Orchestrates repair, regeneration and reconciliation per scope
#[derive(Debug)]
pub struct SyncEngine {
    access: StoreAccess,
    config: SyncConfig,
    observers: Observers,
    reconciler: Reconciler,
}

impl SyncEngine {
    /// Create an engine over `store`, asking `prompter` for decisions
    #[must_use]
    pub fn new(
        store: Arc<dyn ScopeStore>,
        prompter: Arc<dyn Prompter>,
        config: SyncConfig,
    ) -> Self {
        let access = StoreAccess::new(store, prompter);
        let reconciler = Reconciler::from_access(access.clone())
            .with_default_resolution(config.default_resolution);
        Self {
            access,
            config,
            observers: Observers::new(),
            reconciler,
        }
    }

    /// With an observer notified after every state change
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RefreshObserver>) -> Self {
        self.observers.register(observer);
        self
    }

    /// Engine configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Underlying store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ScopeStore> {
        self.access.store()
    }

    /// Prompt surface
    #[inline]
    #[must_use]
    pub fn prompter(&self) -> &Arc<dyn Prompter> {
        self.access.prompter()
    }

    /// Reconciler used for flattened string changes
    #[inline]
    #[must_use]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Registered observers
    #[inline]
    #[must_use]
    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Scopes that can currently be addressed
    #[must_use]
    pub fn available_scopes(&self) -> Vec<Scope> {
        Scope::ALL
            .into_iter()
            .filter(|scope| self.access.is_available(*scope))
            .collect()
    }

    pub(crate) fn access(&self) -> &StoreAccess {
        &self.access
    }

    /// Route a change notification
    ///
    /// # Errors
    /// Whatever the routed operation returns
    pub async fn handle(&self, event: &ChangeEvent) -> SyncResult<EventOutcome> {
        if !self.access.is_available(event.scope) {
            tracing::debug!(
                scope = %event.scope,
                key = %event.key,
                "change in unavailable scope ignored"
            );
            return Ok(EventOutcome::Ignored);
        }

        match self.config.watched(&event.key) {
            None => {
                tracing::debug!(scope = %event.scope, key = %event.key, "unwatched key ignored");
                Ok(EventOutcome::Ignored)
            }
            Some(Watched::Rules) => self
                .on_rule_set_changed(event.scope)
                .await
                .map(EventOutcome::Synced),
            Some(Watched::Flattened) => self
                .on_flattened_string_changed(event.scope)
                .await
                .map(EventOutcome::Reconciled),
        }
    }

    /// Repair the rule list and regenerate the flattened string from it
    ///
    /// The string is always written. Renamed keys keep the value their
    /// source key had.
    ///
    /// # Errors
    /// - `SyncError::ScopeUnavailable` for a workspace scope with no workspace open
    /// - `SyncError::Store` on read or write failure; a rule list already
    ///   written stays written
    pub async fn on_rule_set_changed(&self, scope: Scope) -> SyncResult<SyncReport> {
        self.access.ensure_available(scope)?;
        let rules = self.access.rules(scope).await?;
        let actual = self.access.flattened(scope).await?;
        let parsed = parse(&actual);

        let repaired = repair(&rules);
        if repaired.changed {
            self.access.warn_repaired(scope, &repaired);
            self.access.save_rules(scope, &repaired.rules).await?;
        }

        let text = build(&entries_after_renames(&repaired.rules, &parsed, &repaired.renames));
        self.access.save_flattened(scope, &text).await?;
        self.observers.refresh(scope);

        let report = SyncReport {
            repaired: repaired.changed,
            renamed: repaired.renames.len(),
            rules: repaired.rules.len(),
            text_changed: text != actual,
        };
        tracing::info!(
            %scope,
            rules = report.rules,
            repaired = report.repaired,
            text_changed = report.text_changed,
            "flattened string regenerated"
        );
        Ok(report)
    }

    /// Reconcile the flattened string against the rule list
    ///
    /// # Errors
    /// Same as [`Reconciler::reconcile`]
    pub async fn on_flattened_string_changed(&self, scope: Scope) -> SyncResult<ReconcileOutcome> {
        let outcome = self.reconciler.reconcile(scope).await?;
        if matches!(
            outcome,
            ReconcileOutcome::Pulled { .. } | ReconcileOutcome::Pushed
        ) {
            self.observers.refresh(scope);
        }
        Ok(outcome)
    }

    /// Offer an import for every available scope
    ///
    /// Failures are logged per scope and do not stop the remaining scopes.
    pub async fn activate(&self) -> Vec<(Scope, ImportOutcome)> {
        if !self.config.offer_import_on_activate {
            tracing::debug!("import offer disabled");
            return Vec::new();
        }

        let mut outcomes = Vec::new();
        for scope in self.available_scopes() {
            match self.offer_import(scope).await {
                Ok(outcome) => outcomes.push((scope, outcome)),
                Err(error) => tracing::error!(%scope, %error, "import offer failed"),
            }
        }
        outcomes
    }

    /// Ask whether to import a flattened string that has no rule list yet
    ///
    /// # Errors
    /// - `SyncError::ScopeUnavailable` for a workspace scope with no workspace open
    /// - `SyncError::Store` on read or write failure
    pub async fn offer_import(&self, scope: Scope) -> SyncResult<ImportOutcome> {
        self.access.ensure_available(scope)?;
        let rules = self.access.rules(scope).await?;
        let parsed = parse(&self.access.flattened(scope).await?);
        if !rules.is_empty() || parsed.is_empty() {
            return Ok(ImportOutcome::NotNeeded);
        }

        let question = format!(
            "The {scope} flattened string has {} entr{} but no rule list. Import them as rules?",
            parsed.entries.len(),
            if parsed.entries.len() == 1 { "y" } else { "ies" }
        );
        if !self.access.prompter().confirm(&question).await {
            tracing::info!(%scope, "import declined");
            return Ok(ImportOutcome::Declined);
        }

        self.import(scope).await
    }

    /// Create the rule list of an empty scope from its flattened string
    ///
    /// Ids are assigned in string order starting at 1. Values stay in the
    /// string; it is only rewritten when repair had to rename keys.
    ///
    /// # Errors
    /// - `SyncError::ScopeUnavailable` for a workspace scope with no workspace open
    /// - `SyncError::Store` on read or write failure
    pub async fn import(&self, scope: Scope) -> SyncResult<ImportOutcome> {
        self.access.ensure_available(scope)?;
        let rules = self.access.rules(scope).await?;
        let parsed = parse(&self.access.flattened(scope).await?);
        if !rules.is_empty() || parsed.is_empty() {
            return Ok(ImportOutcome::NotNeeded);
        }

        let candidate: Vec<Rule> = (1..)
            .zip(&parsed.entries)
            .map(|(id, entry)| Rule::new(id, entry.key.clone()))
            .collect();
        let repaired = repair(&candidate);
        if repaired.changed {
            self.access.warn_repaired(scope, &repaired);
        }
        self.access.save_rules(scope, &repaired.rules).await?;

        if !repaired.renames.is_empty() {
            let entries: Vec<Entry> = repaired
                .rules
                .iter()
                .zip(&parsed.entries)
                .map(|(rule, entry)| Entry::new(rule.key.clone(), entry.value.clone()))
                .collect();
            self.access.save_flattened(scope, &build(&entries)).await?;
        }

        self.observers.refresh(scope);
        tracing::info!(%scope, rules = repaired.rules.len(), "imported rule list");
        Ok(ImportOutcome::Imported {
            rules: repaired.rules.len(),
        })
    }
}

/// Entries for `rules`, looking renamed keys up under the key they had before
///
/// Rules renamed apart from one source key take that key's entries in string
/// order, so `[x, x]` over `x: first` and `x: second` keeps both values. When
/// the string holds fewer entries than the group has rules, the rest share
/// the last value.
fn entries_after_renames(rules: &[Rule], parsed: &Parsed, renames: &KeyRenames) -> Vec<Entry> {
    let mut taken: HashMap<&str, usize> = HashMap::new();
    rules
        .iter()
        .map(|rule| {
            let source = renames.source_of(&rule.key).unwrap_or(&rule.key);
            let value = if renames.iter().any(|r| r.from == source) {
                let nth = taken.entry(source).or_default();
                let value = parsed
                    .entries
                    .iter()
                    .filter(|e| e.key == source)
                    .nth(*nth)
                    .map(|e| e.value.as_str());
                *nth += 1;
                value.or_else(|| parsed.value_of(source))
            } else {
                parsed.value_of(source)
            };
            Entry::new(rule.key.clone(), value.unwrap_or_default())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::{Choice, InputRequest, Severity};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use rulesync_core::SEPARATOR;

    struct Answer(bool);

    #[async_trait]
    impl Prompter for Answer {
        async fn input(&self, _request: InputRequest) -> Option<String> {
            None
        }

        async fn pick(&self, _title: &str, _choices: &[Choice]) -> Option<usize> {
            None
        }

        async fn confirm(&self, _message: &str) -> bool {
            self.0
        }

        fn notify(&self, _severity: Severity, _message: &str) {}
    }

    fn engine(store: &Arc<MemoryStore>, confirm: bool) -> SyncEngine {
        SyncEngine::new(store.clone(), Arc::new(Answer(confirm)), SyncConfig::default())
    }

    #[test]
    fn renamed_keys_take_source_values() {
        let parsed = parse(&["x: first", "x: second"].join(SEPARATOR));
        let repaired = repair(&[Rule::new(1, "x"), Rule::new(2, "x")]);
        let entries = entries_after_renames(&repaired.rules, &parsed, &repaired.renames);
        assert_eq!(
            entries,
            vec![Entry::new("x", "first"), Entry::new("x_duplicate_1", "second")]
        );
    }

    #[test]
    fn renamed_keys_share_a_lone_value() {
        let parsed = parse(&["y: 0", "x: only"].join(SEPARATOR));
        let repaired = repair(&[Rule::new(1, "x"), Rule::new(2, "y"), Rule::new(3, "x")]);
        let entries = entries_after_renames(&repaired.rules, &parsed, &repaired.renames);
        assert_eq!(
            entries,
            vec![
                Entry::new("x", "only"),
                Entry::new("y", "0"),
                Entry::new("x_duplicate_1", "only"),
            ]
        );
    }

    #[test]
    fn unrenamed_duplicate_entries_use_last_value() {
        let parsed = parse(&["x: first", "x: second"].join(SEPARATOR));
        let repaired = repair(&[Rule::new(1, "x")]);
        let entries = entries_after_renames(&repaired.rules, &parsed, &repaired.renames);
        assert_eq!(entries, vec![Entry::new("x", "second")]);
    }

    #[tokio::test]
    async fn unwatched_keys_are_ignored() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&store, true);
        let outcome = engine
            .handle(&ChangeEvent::new(Scope::Global, "editor.fontSize"))
            .await
            .unwrap();
        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(store.take_changes().is_empty());
    }

    #[tokio::test]
    async fn workspace_events_suppressed_without_workspace() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(&store, true);
        let event = ChangeEvent::new(Scope::Workspace, engine.config().rules_key.clone());
        assert_eq!(engine.handle(&event).await.unwrap(), EventOutcome::Ignored);
        assert_eq!(engine.available_scopes(), vec![Scope::Global]);
    }

    #[tokio::test]
    async fn rule_change_regenerates_text() {
        let store = Arc::new(MemoryStore::new());
        store.seed_rules(Scope::Global, vec![Rule::new(1, "b"), Rule::new(2, "a")]);
        store.seed_flattened(Scope::Global, ["a: 1", "b: 2"].join(SEPARATOR));
        let engine = engine(&store, true);

        let report = engine.on_rule_set_changed(Scope::Global).await.unwrap();
        assert!(report.text_changed);
        assert!(!report.repaired);
        assert_eq!(store.flattened(Scope::Global), ["b: 2", "a: 1"].join(SEPARATOR));

        let again = engine.on_rule_set_changed(Scope::Global).await.unwrap();
        assert!(!again.text_changed);
    }

    #[tokio::test]
    async fn import_declined_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        store.seed_flattened(Scope::Global, "foo: bar");
        let engine = engine(&store, false);

        assert_eq!(
            engine.offer_import(Scope::Global).await.unwrap(),
            ImportOutcome::Declined
        );
        assert!(store.take_changes().is_empty());
    }

    #[tokio::test]
    async fn import_not_needed_with_rules() {
        let store = Arc::new(MemoryStore::new());
        store.seed_rules(Scope::Global, vec![Rule::new(1, "a")]);
        store.seed_flattened(Scope::Global, "foo: bar");
        let engine = engine(&store, true);
        assert_eq!(
            engine.offer_import(Scope::Global).await.unwrap(),
            ImportOutcome::NotNeeded
        );
    }
}
