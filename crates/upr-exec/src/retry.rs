//! Bounded retry around a command invocation.

use std::time::Duration;

use crate::error::ExecError;
use crate::runner::CommandRunner;
use crate::spec::{CommandOutput, CommandSpec};

/// Run `spec` up to `attempts` times, sleeping `delay` between failed
/// attempts. Returns the first successful output, or the last failed output
/// once the bound is reached (spawn/timeout errors propagate immediately).
///
/// The restore path of the database migrator and the driver's remote
/// executor both use this with `attempts = 3`.
pub async fn run_with_retry(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
    attempts: u32,
    delay: Duration,
) -> Result<(CommandOutput, u32), ExecError> {
    debug_assert!(attempts >= 1);
    let mut last = CommandOutput::default();

    for attempt in 1..=attempts {
        let output = runner.run(spec).await?;
        if output.success() {
            return Ok((output, attempt));
        }

        tracing::warn!(
            command = %spec,
            attempt,
            attempts,
            code = ?output.code,
            "command attempt failed"
        );
        last = output;

        if attempt < attempts {
            tokio::time::sleep(delay).await;
        }
    }

    Ok((last, attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeRunner;

    #[tokio::test]
    async fn returns_on_first_success() {
        let runner = FakeRunner::new();
        runner.respond("pg_restore", CommandOutput::exit(0, "", ""));

        let spec = CommandSpec::new("pg_restore").arg("-d").arg("app");
        let (output, attempt) = run_with_retry(&runner, &spec, 3, Duration::ZERO)
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(attempt, 1);
        assert_eq!(runner.calls_for("pg_restore"), 1);
    }

    #[tokio::test]
    async fn third_attempt_success_is_reported_as_three() {
        let runner = FakeRunner::new();
        runner.respond_seq(
            "pg_restore",
            [
                CommandOutput::exit(1, "", "connection reset"),
                CommandOutput::exit(1, "", "connection reset"),
                CommandOutput::exit(0, "", ""),
            ],
        );

        let spec = CommandSpec::new("pg_restore");
        let (output, attempt) = run_with_retry(&runner, &spec, 3, Duration::ZERO)
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(attempt, 3);
        assert_eq!(runner.calls_for("pg_restore"), 3);
    }

    #[tokio::test]
    async fn never_exceeds_the_attempt_bound() {
        let runner = FakeRunner::new();
        runner.respond("pg_restore", CommandOutput::exit(1, "", "boom"));

        let spec = CommandSpec::new("pg_restore");
        let (output, attempt) = run_with_retry(&runner, &spec, 3, Duration::ZERO)
            .await
            .unwrap();
        assert!(!output.success());
        assert_eq!(attempt, 3);
        // Exactly 3 invocations, never a 4th.
        assert_eq!(runner.calls_for("pg_restore"), 3);
    }
}
