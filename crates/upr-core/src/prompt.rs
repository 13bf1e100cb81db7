//! Confirmation and secret-entry seam.
//!
//! Destructive operations (dropping a database, purge-and-reinstall of the
//! web server) and the driver's continue-after-failure choice all go through
//! the [`Prompt`] trait. Library crates never touch a terminal; the real
//! terminal implementation lives in the CLI crate, and a [`ConfirmPolicy`]
//! can pre-answer everything for unattended runs.

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// How confirmation questions are answered for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfirmPolicy {
    /// Ask interactively.
    #[default]
    Prompt,
    /// Answer yes to everything (`--yes`).
    AlwaysYes,
    /// Answer no to everything (`--no`); makes the run non-destructive.
    AlwaysNo,
}

/// Injected confirmation/secret capability.
pub trait Prompt: Send + Sync {
    /// Ask a yes/no question. `default_answer` is used when the operator just
    /// presses enter.
    fn confirm(&self, question: &str, default_answer: bool) -> Result<bool, CoreError>;

    /// Read a secret with echo suppressed.
    fn password(&self, prompt: &str) -> Result<String, CoreError>;
}

/// Wraps an inner prompt with a pre-supplied policy: `AlwaysYes`/`AlwaysNo`
/// short-circuit without consulting the inner prompt.
pub struct PolicyPrompt<P> {
    policy: ConfirmPolicy,
    inner: P,
}

impl<P: Prompt> PolicyPrompt<P> {
    pub const fn new(policy: ConfirmPolicy, inner: P) -> Self {
        Self { policy, inner }
    }
}

impl<P: Prompt> Prompt for PolicyPrompt<P> {
    fn confirm(&self, question: &str, default_answer: bool) -> Result<bool, CoreError> {
        match self.policy {
            ConfirmPolicy::AlwaysYes => Ok(true),
            ConfirmPolicy::AlwaysNo => Ok(false),
            ConfirmPolicy::Prompt => self.inner.confirm(question, default_answer),
        }
    }

    fn password(&self, prompt: &str) -> Result<String, CoreError> {
        self.inner.password(prompt)
    }
}

/// Prompt for non-interactive contexts: every confirmation is an error and
/// every password read fails, so misconfigured unattended runs fail loudly
/// instead of hanging on a terminal that is not there.
pub struct NoTerminal;

impl Prompt for NoTerminal {
    fn confirm(&self, question: &str, _default_answer: bool) -> Result<bool, CoreError> {
        Err(CoreError::ConfirmationUnavailable {
            action: question.to_string(),
        })
    }

    fn password(&self, prompt: &str) -> Result<String, CoreError> {
        Err(CoreError::ConfirmationUnavailable {
            action: prompt.to_string(),
        })
    }
}

/// Scripted prompt for tests: answers are consumed in order, and every
/// question asked is recorded.
pub struct ScriptedPrompt {
    answers: std::sync::Mutex<std::collections::VecDeque<bool>>,
    asked: std::sync::Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: std::sync::Mutex::new(answers.into_iter().collect()),
            asked: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

impl Prompt for ScriptedPrompt {
    fn confirm(&self, question: &str, default_answer: bool) -> Result<bool, CoreError> {
        self.asked.lock().unwrap().push(question.to_string());
        Ok(self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(default_answer))
    }

    fn password(&self, _prompt: &str) -> Result<String, CoreError> {
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_always_no_never_consults_inner() {
        let prompt = PolicyPrompt::new(ConfirmPolicy::AlwaysNo, NoTerminal);
        assert!(!prompt.confirm("drop database app?", true).unwrap());
    }

    #[test]
    fn policy_always_yes_never_consults_inner() {
        let prompt = PolicyPrompt::new(ConfirmPolicy::AlwaysYes, NoTerminal);
        assert!(prompt.confirm("purge and reinstall nginx?", false).unwrap());
    }

    #[test]
    fn scripted_prompt_consumes_answers_then_defaults() {
        let prompt = ScriptedPrompt::new([true, false]);
        assert!(prompt.confirm("q1", false).unwrap());
        assert!(!prompt.confirm("q2", true).unwrap());
        // Exhausted: falls back to the default answer.
        assert!(prompt.confirm("q3", true).unwrap());
        assert_eq!(prompt.asked(), vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn no_terminal_refuses() {
        let err = NoTerminal.confirm("continue?", true).unwrap_err();
        assert!(matches!(err, CoreError::ConfirmationUnavailable { .. }));
    }

    #[test]
    fn confirm_policy_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&ConfirmPolicy::AlwaysYes).unwrap(),
            "\"always-yes\""
        );
    }
}
