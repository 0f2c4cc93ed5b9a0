//! Divergence detection and resolution
//!
//! The rule list of a scope, combined with the values found in its stored
//! flattened string, determines what that string should be. When the stored
//! string differs, someone edited it from outside and one side has to win:
//!
//! - **pull**: rebuild the rule list from the string's keys
//! - **push**: rebuild the string from the rule list
//!
//! There is no third option. A dismissed decision writes nothing.

use crate::access::StoreAccess;
use crate::config::Resolution;
use crate::error::SyncResult;
use crate::prompt::{Choice, Prompter};
use crate::store::ScopeStore;
use rulesync_core::{build, next_id, parse, renumber, repair, Entry, Parsed, Rule, Scope};
use std::collections::HashMap;
use std::sync::Arc;

/// Stored string versus the string the rule list implies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// String derived from the rule list and the stored values
    pub expected: String,
    /// String found in the store
    pub actual: String,
    /// Keys present in the stored string but not in the rule list
    pub unmanaged: Vec<String>,
    /// Rule keys absent from the stored string
    pub missing: Vec<String>,
}

/// Result of a reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Both sides already agree
    InSync,
    /// Rule list rebuilt from the flattened string
    Pulled {
        /// Rules after the pull
        rules: usize,
        /// Keys renamed by repair
        renamed: usize,
    },
    /// Flattened string rebuilt from the rule list
    Pushed,
    /// Decision dismissed; nothing written
    Cancelled,
}

/// Detects and resolves divergence between the two sides of a scope
#[derive(Debug, Clone)]
pub struct Reconciler {
    access: StoreAccess,
    default_resolution: Option<Resolution>,
}

impl Reconciler {
    /// Create a reconciler that asks `prompter` how to resolve divergence
    #[must_use]
    pub fn new(store: Arc<dyn ScopeStore>, prompter: Arc<dyn Prompter>) -> Self {
        Self::from_access(StoreAccess::new(store, prompter))
    }

    pub(crate) fn from_access(access: StoreAccess) -> Self {
        Self {
            access,
            default_resolution: None,
        }
    }

    /// Resolve divergence this way without asking
    #[inline]
    #[must_use]
    pub fn with_default_resolution(mut self, resolution: Option<Resolution>) -> Self {
        self.default_resolution = resolution;
        self
    }

    /// Compare the stored string with the one the rule list implies
    ///
    /// # Errors
    /// - `SyncError::ScopeUnavailable` for a workspace scope with no workspace open
    /// - `SyncError::Store` if either side cannot be read
    pub async fn divergence(&self, scope: Scope) -> SyncResult<Option<Divergence>> {
        self.access.ensure_available(scope)?;
        let rules = self.access.rules(scope).await?;
        let actual = self.access.flattened(scope).await?;
        Ok(divergence_of(&rules, actual))
    }

    /// Check a scope and, on divergence, obtain and apply a resolution
    ///
    /// # Errors
    /// Same as [`Reconciler::divergence`], plus store write failures while resolving
    pub async fn reconcile(&self, scope: Scope) -> SyncResult<ReconcileOutcome> {
        let Some(divergence) = self.divergence(scope).await? else {
            tracing::debug!(%scope, "flattened string matches rule list");
            return Ok(ReconcileOutcome::InSync);
        };

        tracing::info!(
            %scope,
            unmanaged = divergence.unmanaged.len(),
            missing = divergence.missing.len(),
            "flattened string diverged from rule list"
        );

        let Some(resolution) = self.decide(scope, &divergence).await else {
            tracing::info!(%scope, "divergence left unresolved");
            return Ok(ReconcileOutcome::Cancelled);
        };

        self.resolve(scope, resolution).await
    }

    /// Apply a resolution without asking
    ///
    /// # Errors
    /// `SyncError::Store` if reading or writing either side fails
    pub async fn resolve(
        &self,
        scope: Scope,
        resolution: Resolution,
    ) -> SyncResult<ReconcileOutcome> {
        match resolution {
            Resolution::Pull => self.pull(scope).await,
            Resolution::Push => self.push(scope).await,
        }
    }

    /// Rebuild the rule list from the keys of the stored string
    ///
    /// Surviving keys keep their ids; new keys get fresh ones. When repair has
    /// to rename duplicated keys, the string is rewritten with each entry's own
    /// value under its new key.
    ///
    /// # Errors
    /// `SyncError::Store` if reading or writing either side fails
    pub async fn pull(&self, scope: Scope) -> SyncResult<ReconcileOutcome> {
        self.access.ensure_available(scope)?;
        let existing = self.access.rules(scope).await?;
        let parsed = parse(&self.access.flattened(scope).await?);

        let candidate = rules_from_entries(&existing, &parsed.entries);
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

        tracing::info!(
            %scope,
            rules = repaired.rules.len(),
            "pulled rule list from flattened string"
        );
        Ok(ReconcileOutcome::Pulled {
            rules: repaired.rules.len(),
            renamed: repaired.renames.len(),
        })
    }

    /// Overwrite the stored string from the rule list and the stored values
    ///
    /// # Errors
    /// `SyncError::Store` if reading or writing either side fails
    pub async fn push(&self, scope: Scope) -> SyncResult<ReconcileOutcome> {
        self.access.ensure_available(scope)?;
        let rules = self.access.rules(scope).await?;
        let parsed = parse(&self.access.flattened(scope).await?);

        self.access
            .save_flattened(scope, &expected_text(&rules, &parsed))
            .await?;

        tracing::info!(%scope, rules = rules.len(), "pushed rule list over flattened string");
        Ok(ReconcileOutcome::Pushed)
    }

    async fn decide(&self, scope: Scope, divergence: &Divergence) -> Option<Resolution> {
        if let Some(resolution) = self.default_resolution {
            tracing::debug!(%scope, %resolution, "using configured resolution");
            return Some(resolution);
        }

        let title = format!(
            "The {scope} flattened string was changed outside the rule list \
             ({} unmanaged key(s), {} missing key(s)). Which side should win?",
            divergence.unmanaged.len(),
            divergence.missing.len()
        );
        let choices = [
            Choice::new("Pull external changes")
                .with_detail("Rebuild the rule list from the flattened string"),
            Choice::new("Push rule list")
                .with_detail("Overwrite the flattened string from the rule list"),
        ];

        match self.access.prompter().pick(&title, &choices).await {
            Some(0) => Some(Resolution::Pull),
            Some(1) => Some(Resolution::Push),
            _ => None,
        }
    }
}

/// Flattened string implied by `rules` and the values in `parsed`
#[must_use]
pub fn expected_text(rules: &[Rule], parsed: &Parsed) -> String {
    build(&parsed.entries_for(rules))
}

fn divergence_of(rules: &[Rule], actual: String) -> Option<Divergence> {
    let parsed = parse(&actual);
    let expected = expected_text(rules, &parsed);
    if expected == actual {
        return None;
    }

    let unmanaged = parsed
        .values
        .keys()
        .filter(|key| !rules.iter().any(|r| &r.key == *key))
        .cloned()
        .collect();
    let missing = rules
        .iter()
        .filter(|r| parsed.value_of(&r.key).is_none())
        .map(|r| r.key.clone())
        .collect();

    Some(Divergence {
        expected,
        actual,
        unmanaged,
        missing,
    })
}

/// Rule list for `entries`, reusing the ids of `existing` rules by key
///
/// Keys not found in `existing` get ids counting up from one past the largest
/// existing id. If those run past `i64::MAX`, the whole list is renumbered.
#[must_use]
pub fn rules_from_entries(existing: &[Rule], entries: &[Entry]) -> Vec<Rule> {
    let mut known: HashMap<&str, i64> = HashMap::with_capacity(existing.len());
    for rule in existing {
        known.entry(rule.key.as_str()).or_insert(rule.id);
    }

    let mut fresh = next_id(existing);
    let mut exhausted = false;
    let mut rules: Vec<Rule> = entries
        .iter()
        .map(|entry| {
            let id = known.get(entry.key.as_str()).copied().or_else(|| {
                let id = fresh?;
                fresh = id.checked_add(1);
                Some(id)
            });
            exhausted |= id.is_none();
            Rule::new(id.unwrap_or_default(), entry.key.clone())
        })
        .collect();

    if exhausted {
        tracing::warn!(rules = rules.len(), "rule ids exhausted, renumbering");
        renumber(&mut rules);
    }
    rules
}
