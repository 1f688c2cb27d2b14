//! External command execution port.
//!
//! Every tool the installer shells out to (`nvidia-smi`, `sc.exe`, `reg.exe`,
//! `systemctl`, the provisioned interpreter) goes through [`CommandRunner`],
//! so orchestration tests can script exit codes and output.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A command to run: program, arguments, and optional environment overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Kill the command if it runs longer than this.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: PathBuf::from(program.as_ref()),
            args: Vec::new(),
            current_dir: None,
            env: Vec::new(),
            timeout: None,
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
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// File name of the program, used to match scripted commands in tests.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.to_string_lossy(), |n| n.to_string_lossy())
            .into_owned()
    }

    /// The command line as it would be typed, for logs.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.contains(' ') {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }

    /// Stderr if present, otherwise stdout; trimmed for error messages.
    pub fn detail(&self) -> String {
        let text = if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        };
        text.trim().to_string()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The program could not be started at all (missing, not executable).
    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The program did not finish within the allotted time.
    #[error("{program} did not finish within {seconds}s")]
    TimedOut { program: String, seconds: u64 },
}

/// Runs external commands to completion.
///
/// A non-zero exit is NOT an error at this level; callers inspect
/// [`CommandOutput::code`] and decide.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let spec = CommandSpec::new("sc.exe")
            .arg("create")
            .arg("whisper-api")
            .arg("DisplayName= Whisper API Server");
        assert_eq!(
            spec.display(),
            "sc.exe create whisper-api \"DisplayName= Whisper API Server\""
        );
    }

    #[test]
    fn program_name_strips_directories() {
        let spec = CommandSpec::new("/usr/bin/nvidia-smi");
        assert_eq!(spec.program_name(), "nvidia-smi");
    }

    #[test]
    fn detail_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "partial".to_string(),
            stderr: "  boom \n".to_string(),
        };
        assert_eq!(output.detail(), "boom");
        assert!(!output.success());
        assert_eq!(CommandOutput::ok(" out ").detail(), "out");
    }
}
