//! Scripted command runner for tests.
//!
//! `FakeRunner` is the test double every workflow crate runs against: it
//! matches invocations by program name (and optionally an argument/stdin
//! substring), replays scripted outputs, and records every call so tests can
//! assert which external commands were (and were not) issued.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ExecError;
use crate::runner::CommandRunner;
use crate::spec::{CommandOutput, CommandSpec};

struct Rule {
    program: String,
    needle: Option<String>,
    queue: VecDeque<CommandOutput>,
    /// Last element of the original script; replayed once the queue is empty.
    last: CommandOutput,
}

/// Scripted, recording implementation of [`CommandRunner`].
///
/// Matching order: substring rules first (registration order), then
/// program-only rules. A scripted sequence replays its final output forever
/// once exhausted. Unmatched invocations succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `output` for `program`.
    pub fn respond(&self, program: &str, output: CommandOutput) {
        self.push_rule(program, None, [output]);
    }

    /// Answer the scripted sequence for `program`, in order.
    pub fn respond_seq(&self, program: &str, outputs: impl IntoIterator<Item = CommandOutput>) {
        self.push_rule(program, None, outputs);
    }

    /// Answer `output` for invocations of `program` whose joined args (or
    /// stdin payload) contain `needle`.
    pub fn respond_when(&self, program: &str, needle: &str, output: CommandOutput) {
        self.push_rule(program, Some(needle), [output]);
    }

    /// Scripted sequence for invocations matching `needle`.
    pub fn respond_when_seq(
        &self,
        program: &str,
        needle: &str,
        outputs: impl IntoIterator<Item = CommandOutput>,
    ) {
        self.push_rule(program, Some(needle), outputs);
    }

    fn push_rule(
        &self,
        program: &str,
        needle: Option<&str>,
        outputs: impl IntoIterator<Item = CommandOutput>,
    ) {
        let mut queue: VecDeque<CommandOutput> = outputs.into_iter().collect();
        assert!(!queue.is_empty(), "scripted rule needs at least one output");
        let last = queue.back().cloned().unwrap_or_default();
        // Keep the last element out of the queue; it is the sticky fallback.
        queue.pop_back();
        self.rules.lock().unwrap().push(Rule {
            program: program.to_string(),
            needle: needle.map(str::to_string),
            queue,
            last,
        });
    }

    /// All recorded invocations, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations of `program`.
    #[must_use]
    pub fn calls_for(&self, program: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.program == program)
            .count()
    }

    /// Number of invocations of `program` whose args or stdin contain `needle`.
    #[must_use]
    pub fn calls_matching(&self, program: &str, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|spec| spec.program == program && haystack(spec).contains(needle))
            .count()
    }
}

fn haystack(spec: &CommandSpec) -> String {
    let mut text = spec.args.join(" ");
    if let Some(stdin) = &spec.stdin {
        text.push(' ');
        text.push_str(stdin);
    }
    text
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.calls.lock().unwrap().push(spec.clone());

        let text = haystack(spec);
        let mut rules = self.rules.lock().unwrap();

        // Substring rules win over program-only rules.
        for pass in [true, false] {
            for rule in rules.iter_mut() {
                if rule.program != spec.program {
                    continue;
                }
                match (&rule.needle, pass) {
                    (Some(needle), true) if text.contains(needle.as_str()) => {}
                    (None, false) => {}
                    _ => continue,
                }
                return Ok(rule.queue.pop_front().unwrap_or_else(|| rule.last.clone()));
            }
        }

        Ok(CommandOutput::exit(0, "", ""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn substring_rules_take_precedence() {
        let runner = FakeRunner::new();
        runner.respond("psql", CommandOutput::exit(0, "generic", ""));
        runner.respond_when("psql", "SELECT 1", CommandOutput::exit(0, "1", ""));

        let ping = CommandSpec::new("psql").args(["-tA", "-c", "SELECT 1"]);
        let other = CommandSpec::new("psql").args(["-tA", "-c", "SELECT datname FROM pg_database"]);

        assert_eq!(runner.run(&ping).await.unwrap().stdout, "1");
        assert_eq!(runner.run(&other).await.unwrap().stdout, "generic");
    }

    #[tokio::test]
    async fn sequences_stick_on_their_last_output() {
        let runner = FakeRunner::new();
        runner.respond_seq(
            "nginx",
            [CommandOutput::exit(1, "", "broken"), CommandOutput::exit(0, "", "ok")],
        );

        let spec = CommandSpec::new("nginx").arg("-t");
        assert_eq!(runner.run(&spec).await.unwrap().code, Some(1));
        assert_eq!(runner.run(&spec).await.unwrap().code, Some(0));
        assert_eq!(runner.run(&spec).await.unwrap().code, Some(0));
    }

    #[tokio::test]
    async fn stdin_participates_in_matching() {
        let runner = FakeRunner::new();
        runner.respond_when("psql", "CREATE ROLE", CommandOutput::exit(0, "replayed", ""));

        let spec = CommandSpec::new("psql").stdin("CREATE ROLE app_rw;");
        assert_eq!(runner.run(&spec).await.unwrap().stdout, "replayed");
        assert_eq!(runner.calls_matching("psql", "CREATE ROLE"), 1);
    }

    #[tokio::test]
    async fn unmatched_calls_succeed_and_are_recorded() {
        let runner = FakeRunner::new();
        let spec = CommandSpec::new("systemctl").args(["stop", "nginx"]);
        assert!(runner.run(&spec).await.unwrap().success());
        assert_eq!(runner.calls_for("systemctl"), 1);
    }
}
