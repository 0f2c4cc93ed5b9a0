//! Testing utilities for the rulesync workspace
//!
//! Scripted prompter, recording observer, fixtures and an event pump that
//! feeds store writes back into the engine the way a host would.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use rulesync_core::{Rule, Scope, SEPARATOR};
use rulesync_engine::prelude::*;
use rulesync_engine::{EventOutcome, MemoryStore, RefreshObserver};
use std::collections::VecDeque;
use std::sync::Arc;

/// Rounds after which [`pump`] gives up on the engine settling
pub const MAX_PUMP_ROUNDS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Input(Option<String>),
    Pick(Option<usize>),
    Confirm(bool),
}

/// Prompter answering from a script, in order
///
/// Panics when asked something the script does not expect next.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
    messages: Mutex<Vec<(Severity, String)>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(self, answer: Option<&str>) -> Self {
        self.push(Answer::Input(answer.map(str::to_string)))
    }

    pub fn with_pick(self, answer: Option<usize>) -> Self {
        self.push(Answer::Pick(answer))
    }

    pub fn with_confirm(self, answer: bool) -> Self {
        self.push(Answer::Confirm(answer))
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn push(self, answer: Answer) -> Self {
        self.answers.lock().push_back(answer);
        self
    }

    fn next(&self, question: &str) -> Answer {
        self.asked.lock().push(question.to_string());
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted prompt: {question}"))
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.lock().len()
    }

    /// Prompts shown so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    /// Messages shown so far
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().clone()
    }

    pub fn messages_of(&self, severity: Severity) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&self, request: InputRequest) -> Option<String> {
        match self.next(&request.prompt) {
            Answer::Input(answer) => {
                if let Some(text) = &answer {
                    assert!(request.accepts(text), "input validator refused {text:?}");
                }
                answer
            }
            other => panic!(
                "expected an input answer for {:?}, script has {other:?}",
                request.prompt
            ),
        }
    }

    async fn pick(&self, title: &str, choices: &[Choice]) -> Option<usize> {
        match self.next(title) {
            Answer::Pick(answer) => {
                if let Some(index) = answer {
                    assert!(index < choices.len(), "pick {index} out of {} choices", choices.len());
                }
                answer
            }
            other => panic!("expected a pick answer for {title:?}, script has {other:?}"),
        }
    }

    async fn confirm(&self, message: &str) -> bool {
        match self.next(message) {
            Answer::Confirm(answer) => answer,
            other => panic!("expected a confirm answer for {message:?}, script has {other:?}"),
        }
    }

    fn notify(&self, severity: Severity, message: &str) {
        self.messages.lock().push((severity, message.to_string()));
    }
}

/// Observer remembering every refreshed scope
#[derive(Debug, Default)]
pub struct RecordingObserver {
    scopes: Mutex<Vec<Scope>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn scopes(&self) -> Vec<Scope> {
        self.scopes.lock().clone()
    }
}

impl RefreshObserver for RecordingObserver {
    fn refresh(&self, scope: Scope) {
        self.scopes.lock().push(scope);
    }
}

/// Rules from `(id, key)` pairs
pub fn rules(pairs: &[(i64, &str)]) -> Vec<Rule> {
    pairs.iter().map(|(id, key)| Rule::new(*id, *key)).collect()
}

/// Flattened string from `key: value` entries
pub fn flattened(entries: &[&str]) -> String {
    entries.join(SEPARATOR)
}

/// Engine over a memory store with default configuration
pub fn engine(store: &Arc<MemoryStore>, prompter: &Arc<ScriptedPrompter>) -> SyncEngine {
    SyncEngine::new(store.clone(), prompter.clone(), SyncConfig::default())
}

/// Feed recorded store writes back to the engine until it stops writing
///
/// Panics if the engine does not settle within [`MAX_PUMP_ROUNDS`].
pub async fn pump(engine: &SyncEngine, store: &MemoryStore) -> Vec<EventOutcome> {
    let mut outcomes = Vec::new();
    for _ in 0..MAX_PUMP_ROUNDS {
        let changes = store.take_changes();
        if changes.is_empty() {
            return outcomes;
        }
        for (scope, item) in changes {
            let event = ChangeEvent::new(scope, engine.config().key_of(item));
            outcomes.push(engine.handle(&event).await.unwrap());
        }
    }
    panic!("engine did not settle after {MAX_PUMP_ROUNDS} rounds: {outcomes:?}");
}
