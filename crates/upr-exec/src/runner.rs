//! The `CommandRunner` trait and its real tokio-backed implementation.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::ExecError;
use crate::spec::{CommandOutput, CommandSpec};

/// Runs external commands. Workflows hold a `&dyn CommandRunner` so tests can
/// substitute the scripted fake.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and capture its output. A non-zero exit
    /// is not an `Err`; callers decide what exit codes mean.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// Real implementation over `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        tracing::debug!(command = %spec, "running external command");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .kill_on_drop(true);
        for (key, value) in &spec.envs {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|source| ExecError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        if let Some(payload) = &spec.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(payload.as_bytes())
                    .await
                    .map_err(|source| ExecError::Io {
                        program: spec.program.clone(),
                        source,
                    })?;
                // Dropping stdin closes the pipe so the child sees EOF.
            }
        }

        let wait = child.wait_with_output();
        let output = match spec.timeout {
            Some(limit) => timeout(limit, wait).await.map_err(|_| ExecError::Timeout {
                program: spec.program.clone(),
                timeout_secs: limit.as_secs(),
            })?,
            None => wait.await,
        }
        .map_err(|source| ExecError::Io {
            program: spec.program.clone(),
            source,
        })?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            tracing::debug!(
                command = %spec,
                code = ?result.code,
                "external command exited non-zero"
            );
        }

        Ok(result)
    }
}
