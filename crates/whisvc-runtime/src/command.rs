//! External command execution.
//!
//! [`ProcessCommandRunner`] is the production [`CommandRunner`]. Callers go
//! through [`run_logged`] so that every invocation's full output lands in the
//! install log before anyone looks at the exit code.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};
use whisvc_core::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Runs commands with `tokio::process`, capturing stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandRunner;

#[async_trait]
impl CommandRunner for ProcessCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| CommandError::Spawn {
            program: spec.program.display().to_string(),
            reason: e.to_string(),
        })?;

        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| CommandError::TimedOut {
                    program: spec.program_name(),
                    seconds: limit.as_secs(),
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| CommandError::Spawn {
            program: spec.program.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run `spec` and log its complete output.
///
/// Successful runs log at debug, failures at warn. The output is returned
/// unchanged; a non-zero exit is still `Ok`.
pub async fn run_logged(
    runner: &dyn CommandRunner,
    spec: &CommandSpec,
) -> Result<CommandOutput, CommandError> {
    debug!(command = %spec.display(), "Running command");

    let output = match runner.run(spec).await {
        Ok(output) => output,
        Err(e) => {
            warn!(command = %spec.display(), error = %e, "Command could not be run");
            return Err(e);
        }
    };

    let code = output
        .code
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    if output.success() {
        debug!(
            command = %spec.display(),
            exit_code = %code,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "Command finished"
        );
    } else {
        warn!(
            command = %spec.display(),
            exit_code = %code,
            stdout = %output.stdout,
            stderr = %output.stderr,
            "Command failed"
        );
    }
    Ok(output)
}
