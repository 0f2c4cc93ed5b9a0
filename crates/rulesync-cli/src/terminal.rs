//! Line-based prompts on stdin / stderr
//!
//! End of input dismisses whatever is being asked.

use async_trait::async_trait;
use rulesync_engine::{Choice, InputRequest, Prompter, Severity};
use std::io::{BufRead, Write};

/// How a typed line answers a pick list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickAnswer {
    /// Zero-based index of the chosen entry
    Chosen(usize),
    /// Empty line: dismiss
    Dismissed,
    /// Not a listed number: ask again
    Invalid,
}

/// Interpret a line typed in answer to a pick list of `len` entries
#[must_use]
pub fn parse_pick(line: &str, len: usize) -> PickAnswer {
    let line = line.trim();
    if line.is_empty() {
        return PickAnswer::Dismissed;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => PickAnswer::Chosen(n - 1),
        _ => PickAnswer::Invalid,
    }
}

/// Interpret a line typed in answer to a yes/no question
#[must_use]
pub fn parse_confirm(line: &str) -> bool {
    matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Prompter for an interactive terminal
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    /// Create a terminal prompter
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn ask(&self, prompt: String) -> Option<String> {
        tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr().lock();
            let _ = write!(stderr, "{prompt}");
            let _ = stderr.flush();

            let mut line = String::new();
            match std::io::stdin().lock().read_line(&mut line) {
                Ok(0) | Err(_) => None,
                Ok(_) => Some(line.trim_end_matches(['\n', '\r']).to_string()),
            }
        })
        .await
        .ok()
        .flatten()
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn input(&self, request: InputRequest) -> Option<String> {
        let prompt = match &request.initial {
            Some(initial) => format!("{} [{initial}]: ", request.prompt),
            None => format!("{}: ", request.prompt),
        };
        loop {
            let line = self.ask(prompt.clone()).await?;
            let answer = match (&request.initial, line.is_empty()) {
                (Some(initial), true) => initial.clone(),
                _ => line,
            };
            if request.accepts(&answer) {
                return Some(answer);
            }
            eprintln!("A value is required (end of input cancels).");
        }
    }

    async fn pick(&self, title: &str, choices: &[Choice]) -> Option<usize> {
        let mut listing = format!("{title}\n");
        for (n, choice) in choices.iter().enumerate() {
            match &choice.detail {
                Some(detail) => {
                    listing.push_str(&format!("  {}) {}  ({detail})\n", n + 1, choice.label));
                }
                None => listing.push_str(&format!("  {}) {}\n", n + 1, choice.label)),
            }
        }
        eprint!("{listing}");

        loop {
            let line = self.ask(format!("Choose 1-{} (empty cancels): ", choices.len())).await?;
            match parse_pick(&line, choices.len()) {
                PickAnswer::Chosen(index) => return Some(index),
                PickAnswer::Dismissed => return None,
                PickAnswer::Invalid => {
                    eprintln!("'{}' is not one of the listed numbers.", line.trim());
                }
            }
        }
    }

    async fn confirm(&self, message: &str) -> bool {
        self.ask(format!("{message} [y/N]: "))
            .await
            .is_some_and(|line| parse_confirm(&line))
    }

    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => eprintln!("{message}"),
            Severity::Warning => eprintln!("warning: {message}"),
            Severity::Error => eprintln!("error: {message}"),
        }
    }
}

/// Prompter for unattended runs: dismisses every question
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

#[async_trait]
impl Prompter for Unattended {
    async fn input(&self, request: InputRequest) -> Option<String> {
        tracing::warn!(prompt = %request.prompt, "input needed in an unattended run");
        None
    }

    async fn pick(&self, title: &str, _choices: &[Choice]) -> Option<usize> {
        tracing::warn!(%title, "decision needed in an unattended run");
        None
    }

    async fn confirm(&self, message: &str) -> bool {
        tracing::warn!(%message, "confirmation needed in an unattended run");
        false
    }

    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_numbers_are_one_based() {
        assert_eq!(parse_pick("1", 2), PickAnswer::Chosen(0));
        assert_eq!(parse_pick(" 2 ", 2), PickAnswer::Chosen(1));
        assert_eq!(parse_pick("3", 2), PickAnswer::Invalid);
        assert_eq!(parse_pick("0", 2), PickAnswer::Invalid);
        assert_eq!(parse_pick("global", 2), PickAnswer::Invalid);
        assert_eq!(parse_pick("", 2), PickAnswer::Dismissed);
    }

    #[test]
    fn confirm_needs_explicit_yes() {
        assert!(parse_confirm("y"));
        assert!(parse_confirm("YES"));
        assert!(!parse_confirm(""));
        assert!(!parse_confirm("no"));
    }
}
