//! Decision and input surface
//!
//! Every request may come back cancelled (`None` / `false`). Callers treat a
//! cancelled step as the end of the operation and write nothing.

use async_trait::async_trait;
use rulesync_core::validation;

/// Severity of a message shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational
    Info,
    /// Something was fixed or skipped
    Warning,
    /// An operation failed
    Error,
}

/// Free-text input request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRequest {
    /// Prompt shown to the user
    pub prompt: String,
    /// Prefilled text
    pub initial: Option<String>,
    /// Whether an empty answer is refused by the input surface
    pub require_non_empty: bool,
}

impl InputRequest {
    /// Request that refuses empty answers
    #[inline]
    #[must_use]
    pub fn non_empty(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            initial: None,
            require_non_empty: true,
        }
    }

    /// Request that accepts an empty answer
    #[inline]
    #[must_use]
    pub fn any(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            initial: None,
            require_non_empty: false,
        }
    }

    /// With prefilled text
    #[inline]
    #[must_use]
    pub fn with_initial(mut self, initial: impl Into<String>) -> Self {
        self.initial = Some(initial.into());
        self
    }

    /// Whether `answer` passes this request's validator
    #[must_use]
    pub fn accepts(&self, answer: &str) -> bool {
        !self.require_non_empty || validation::non_empty(answer)
    }
}

/// One labeled option of a pick list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    /// Main label
    pub label: String,
    /// Secondary text
    pub detail: Option<String>,
}

impl Choice {
    /// Create a choice
    #[inline]
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: None,
        }
    }

    /// With secondary text
    #[inline]
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// User-facing prompt surface
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Ask for text; `None` when dismissed
    async fn input(&self, request: InputRequest) -> Option<String>;

    /// Ask for one of `choices`; the chosen index, `None` when dismissed
    async fn pick(&self, title: &str, choices: &[Choice]) -> Option<usize>;

    /// Ask a yes/no question; dismissal counts as no
    async fn confirm(&self, message: &str) -> bool;

    /// Show a message
    fn notify(&self, severity: Severity, message: &str);
}
