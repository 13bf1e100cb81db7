//! Command specifications and captured output.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// One external command invocation: program, arguments, environment, an
/// optional timeout, and an optional stdin payload.
///
/// Secrets (e.g. `PGPASSWORD`) are only ever placed in `envs`, never in
/// `args`: argv is visible to every user on the host via `ps`. The
/// `Display` impl renders program and args only, so log lines and error
/// messages can never leak environment values.
#[derive(Debug, Clone, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    #[serde(skip)]
    pub envs: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    #[serde(skip)]
    pub stdin: Option<String>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            timeout: None,
            stdin: None,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn stdin(mut self, payload: impl Into<String>) -> Self {
        self.stdin = Some(payload.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Process exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convenience constructor for fakes and tests.
    #[must_use]
    pub fn exit(code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Stdout split into trimmed, non-empty lines. The shape `psql -tA`
    /// output parsing wants.
    #[must_use]
    pub fn stdout_lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_never_contains_env_values() {
        let spec = CommandSpec::new("psql")
            .args(["-h", "db.internal", "-c", "SELECT 1"])
            .env("PGPASSWORD", "hunter2");
        let rendered = spec.to_string();
        assert_eq!(rendered, "psql -h db.internal -c SELECT 1");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn stdout_lines_trims_and_drops_blanks() {
        let output = CommandOutput::exit(0, " app \n\nanalytics\n \n", "");
        assert_eq!(output.stdout_lines(), vec!["app", "analytics"]);
    }

    #[test]
    fn success_requires_zero_exit() {
        assert!(CommandOutput::exit(0, "", "").success());
        assert!(!CommandOutput::exit(1, "", "").success());
        assert!(!CommandOutput { code: None, ..CommandOutput::default() }.success());
    }
}
