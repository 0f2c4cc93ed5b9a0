//! User commands
//!
//! Each command is a chain of steps. Any step the user dismisses ends the
//! command with [`CommandOutcome::Cancelled`] before anything is written.
//! Stored state is read again after the last prompt, so a change that landed
//! while the user was typing is not overwritten with stale data.

use crate::engine::{SyncEngine, SyncReport};
use crate::error::{SyncError, SyncResult};
use crate::prompt::{Choice, InputRequest, Severity};
use rulesync_core::validation::{ensure_unique_key, validate_key, validate_value};
use rulesync_core::{allocate_id, build, parse, Entry, Rule, Scope};
use serde::Serialize;
use std::sync::Arc;

/// A user command; fields left `None` are asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Append a rule
    Add {
        /// Target scope
        scope: Option<Scope>,
        /// Key of the new rule
        key: Option<String>,
        /// Value of the new rule
        value: Option<String>,
    },
    /// Change the key and value of a rule
    Edit {
        /// Target scope
        scope: Option<Scope>,
        /// Id of the rule
        id: Option<i64>,
        /// New key
        key: Option<String>,
        /// New value
        value: Option<String>,
    },
    /// Remove a rule
    Delete {
        /// Target scope
        scope: Option<Scope>,
        /// Id of the rule
        id: Option<i64>,
        /// Skip the confirmation
        confirmed: bool,
    },
    /// List rules with their values; every available scope when `None`
    View {
        /// Scope to list
        scope: Option<Scope>,
    },
    /// Repair and regenerate; every available scope when `None`
    ForceSync {
        /// Scope to sync
        scope: Option<Scope>,
    },
}

/// One rule joined with its current value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleView {
    /// Scope of the rule
    pub scope: Scope,
    /// Rule id
    pub id: i64,
    /// Rule key
    pub key: String,
    /// Value in the flattened string, if the key is present there
    pub value: Option<String>,
}

/// Result of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Rule appended
    Added {
        /// Scope written
        scope: Scope,
        /// New rule
        rule: Rule,
    },
    /// Rule changed
    Edited {
        /// Scope written
        scope: Scope,
        /// Rule after the edit
        rule: Rule,
    },
    /// Rule removed
    Deleted {
        /// Scope written
        scope: Scope,
        /// Removed rule
        rule: Rule,
    },
    /// Rules listed
    Viewed(Vec<RuleView>),
    /// Scopes synced
    Synced(Vec<(Scope, SyncReport)>),
    /// A prompt was dismissed; nothing written
    Cancelled,
}

/// Runs [`Command`]s against a [`SyncEngine`]
#[derive(Debug, Clone)]
pub struct CommandLayer {
    engine: Arc<SyncEngine>,
}

impl CommandLayer {
    /// Create a command layer
    #[inline]
    #[must_use]
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self { engine }
    }

    /// Engine the commands run against
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Run a command and show its result
    ///
    /// # Errors
    /// Rejected input, an unavailable scope, an unknown rule id or a store
    /// failure. Errors are shown through the prompter before being returned.
    pub async fn run(&self, command: Command) -> SyncResult<CommandOutcome> {
        let result = match command {
            Command::Add { scope, key, value } => self.add_rule(scope, key, value).await,
            Command::Edit {
                scope,
                id,
                key,
                value,
            } => self.edit_rule(scope, id, key, value).await,
            Command::Delete {
                scope,
                id,
                confirmed,
            } => self.delete_rule(scope, id, confirmed).await,
            Command::View { scope } => self.view(scope).await.map(CommandOutcome::Viewed),
            Command::ForceSync { scope } => {
                self.force_sync(scope).await.map(CommandOutcome::Synced)
            }
        };

        match &result {
            Ok(outcome) => {
                if let Some(message) = success_message(outcome) {
                    self.engine.prompter().notify(Severity::Info, &message);
                }
            }
            Err(error) if !error.is_reported() => {
                tracing::warn!(%error, "command rejected");
                self.engine.prompter().notify(Severity::Error, &error.to_string());
            }
            Err(_) => {}
        }
        result
    }

    /// Append a rule and its value
    ///
    /// # Errors
    /// See [`CommandLayer::run`]
    pub async fn add_rule(
        &self,
        scope: Option<Scope>,
        key: Option<String>,
        value: Option<String>,
    ) -> SyncResult<CommandOutcome> {
        let access = self.engine.access();
        let Some(scope) = self.choose_scope(scope).await? else {
            return Ok(CommandOutcome::Cancelled);
        };
        let Some(raw_key) = self.ask(key, InputRequest::non_empty("Rule key")).await else {
            return Ok(CommandOutcome::Cancelled);
        };
        let key = validate_key(&raw_key)?;
        ensure_unique_key(&access.rules(scope).await?, &key, None)?;

        let request = InputRequest::any(format!("Value for '{key}'"));
        let Some(value) = self.ask(value, request).await else {
            return Ok(CommandOutcome::Cancelled);
        };
        validate_value(&key, &value)?;

        let mut rules = access.rules(scope).await?;
        ensure_unique_key(&rules, &key, None)?;
        let rule = Rule::new(allocate_id(&mut rules), key);
        rules.push(rule.clone());
        access.save_rules(scope, &rules).await?;

        let mut entries = parse(&access.flattened(scope).await?).entries;
        entries.push(Entry::new(rule.key.clone(), value));
        access.save_flattened(scope, &build(&entries)).await?;

        self.engine.observers().refresh(scope);
        tracing::info!(%scope, id = rule.id, key = %rule.key, "rule added");
        Ok(CommandOutcome::Added { scope, rule })
    }

    /// Change the key and value of a rule chosen by id
    ///
    /// # Errors
    /// See [`CommandLayer::run`]
    pub async fn edit_rule(
        &self,
        scope: Option<Scope>,
        id: Option<i64>,
        key: Option<String>,
        value: Option<String>,
    ) -> SyncResult<CommandOutcome> {
        let access = self.engine.access();
        let Some(scope) = self.choose_scope(scope).await? else {
            return Ok(CommandOutcome::Cancelled);
        };
        let Some(target) = self.choose_rule(scope, id, "Rule to edit").await? else {
            return Ok(CommandOutcome::Cancelled);
        };

        let request = InputRequest::non_empty("Rule key").with_initial(target.key.clone());
        let Some(raw_key) = self.ask(key, request).await else {
            return Ok(CommandOutcome::Cancelled);
        };
        let new_key = validate_key(&raw_key)?;

        let current = parse(&access.flattened(scope).await?)
            .value_of(&target.key)
            .unwrap_or_default()
            .to_string();
        let request = InputRequest::any(format!("Value for '{new_key}'")).with_initial(current);
        let Some(value) = self.ask(value, request).await else {
            return Ok(CommandOutcome::Cancelled);
        };
        validate_value(&new_key, &value)?;

        let mut rules = access.rules(scope).await?;
        let index = position_of(&rules, scope, target.id)?;
        let old_key = rules[index].key.clone();
        if new_key != old_key {
            ensure_unique_key(&rules, &new_key, Some(target.id))?;
        }
        rules[index].key.clone_from(&new_key);
        let rule = rules[index].clone();
        access.save_rules(scope, &rules).await?;

        let mut entries = parse(&access.flattened(scope).await?).entries;
        let entry = Entry::new(new_key, value);
        match entries.iter().position(|e| e.key == old_key) {
            Some(pos) => entries[pos] = entry,
            None => entries.push(entry),
        }
        access.save_flattened(scope, &build(&entries)).await?;

        self.engine.observers().refresh(scope);
        tracing::info!(%scope, id = rule.id, from = %old_key, to = %rule.key, "rule edited");
        Ok(CommandOutcome::Edited { scope, rule })
    }

    /// Remove a rule chosen by id, together with its value
    ///
    /// # Errors
    /// See [`CommandLayer::run`]
    pub async fn delete_rule(
        &self,
        scope: Option<Scope>,
        id: Option<i64>,
        confirmed: bool,
    ) -> SyncResult<CommandOutcome> {
        let access = self.engine.access();
        let Some(scope) = self.choose_scope(scope).await? else {
            return Ok(CommandOutcome::Cancelled);
        };
        let Some(target) = self.choose_rule(scope, id, "Rule to delete").await? else {
            return Ok(CommandOutcome::Cancelled);
        };

        if !confirmed {
            let question = format!("Delete rule '{}' from the {scope} scope?", target.key);
            if !self.engine.prompter().confirm(&question).await {
                return Ok(CommandOutcome::Cancelled);
            }
        }

        let mut rules = access.rules(scope).await?;
        let index = position_of(&rules, scope, target.id)?;
        let rule = rules.remove(index);
        access.save_rules(scope, &rules).await?;

        let mut entries = parse(&access.flattened(scope).await?).entries;
        entries.retain(|e| e.key != rule.key);
        access.save_flattened(scope, &build(&entries)).await?;

        self.engine.observers().refresh(scope);
        tracing::info!(%scope, id = rule.id, key = %rule.key, "rule deleted");
        Ok(CommandOutcome::Deleted { scope, rule })
    }

    /// Rules joined with their current values
    ///
    /// # Errors
    /// An unavailable scope or a store read failure
    pub async fn view(&self, scope: Option<Scope>) -> SyncResult<Vec<RuleView>> {
        let access = self.engine.access();
        let scopes = match scope {
            Some(scope) => {
                access.ensure_available(scope)?;
                vec![scope]
            }
            None => self.engine.available_scopes(),
        };

        let mut views = Vec::new();
        for scope in scopes {
            let rules = access.rules(scope).await?;
            let parsed = parse(&access.flattened(scope).await?);
            views.extend(rules.into_iter().map(|rule| RuleView {
                scope,
                id: rule.id,
                value: parsed.value_of(&rule.key).map(str::to_string),
                key: rule.key,
            }));
        }
        Ok(views)
    }

    /// Repair and regenerate one scope, or every available one
    ///
    /// # Errors
    /// An unavailable scope or a store failure
    pub async fn force_sync(&self, scope: Option<Scope>) -> SyncResult<Vec<(Scope, SyncReport)>> {
        let scopes = match scope {
            Some(scope) => vec![scope],
            None => self.engine.available_scopes(),
        };

        let mut reports = Vec::with_capacity(scopes.len());
        for scope in scopes {
            reports.push((scope, self.engine.on_rule_set_changed(scope).await?));
        }
        Ok(reports)
    }

    /// Use the given scope or ask for one
    async fn choose_scope(&self, scope: Option<Scope>) -> SyncResult<Option<Scope>> {
        let scope = match scope {
            Some(scope) => scope,
            None => {
                let choices = [
                    Choice::new("Global").with_detail("User-wide settings"),
                    Choice::new("Workspace").with_detail("Settings of the open workspace"),
                ];
                let picked = self.engine.prompter().pick("Scope", &choices).await;
                let Some(scope) = picked.and_then(|index| Scope::ALL.get(index).copied()) else {
                    return Ok(None);
                };
                scope
            }
        };
        self.engine.access().ensure_available(scope)?;
        Ok(Some(scope))
    }

    /// Look a rule up by id, or let the user pick one
    async fn choose_rule(
        &self,
        scope: Scope,
        id: Option<i64>,
        title: &str,
    ) -> SyncResult<Option<Rule>> {
        let rules = self.engine.access().rules(scope).await?;
        if let Some(id) = id {
            let index = position_of(&rules, scope, id)?;
            return Ok(Some(rules[index].clone()));
        }

        if rules.is_empty() {
            self.engine
                .prompter()
                .notify(Severity::Info, &format!("No rules in the {scope} scope"));
            return Ok(None);
        }

        let choices: Vec<Choice> = rules
            .iter()
            .map(|rule| Choice::new(rule.key.clone()).with_detail(format!("#{}", rule.id)))
            .collect();
        let picked = self.engine.prompter().pick(title, &choices).await;
        Ok(picked.and_then(|index| rules.get(index).cloned()))
    }

    async fn ask(&self, given: Option<String>, request: InputRequest) -> Option<String> {
        match given {
            Some(text) => Some(text),
            None => self.engine.prompter().input(request).await,
        }
    }
}

fn position_of(rules: &[Rule], scope: Scope, id: i64) -> SyncResult<usize> {
    rules
        .iter()
        .position(|rule| rule.id == id)
        .ok_or(SyncError::RuleNotFound { scope, id })
}

fn success_message(outcome: &CommandOutcome) -> Option<String> {
    match outcome {
        CommandOutcome::Added { scope, rule } => {
            Some(format!("Added rule '{}' to the {scope} scope", rule.key))
        }
        CommandOutcome::Edited { scope, rule } => {
            Some(format!("Updated rule '{}' in the {scope} scope", rule.key))
        }
        CommandOutcome::Deleted { scope, rule } => {
            Some(format!("Deleted rule '{}' from the {scope} scope", rule.key))
        }
        CommandOutcome::Synced(reports) => {
            let scopes: Vec<&str> = reports.iter().map(|(scope, _)| scope.as_str()).collect();
            Some(format!("Synced {}", scopes.join(", ")))
        }
        CommandOutcome::Viewed(_) | CommandOutcome::Cancelled => None,
    }
}
