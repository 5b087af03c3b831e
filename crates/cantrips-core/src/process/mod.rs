//! External command execution used by the resolution strategies.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

pub use crate::error::ProcessError;

#[cfg(test)]
pub(crate) mod testing;

/// A single external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Human readable step name ("Cloning repository ...")
    pub description: String,
    /// Captured output is only logged at debug level when set.
    pub silent: bool,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
            description: String::new(),
            silent: true,
        }
    }

    /// Parse a manifest-style command vector (`["npm", "run", "build"]`).
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn verbose(mut self) -> Self {
        self.silent = false;
        self
    }

    /// `program arg1 arg2`, for logs and error messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands and returns their captured stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec) -> Result<String, ProcessError>;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<String, ProcessError> {
        let command_line = spec.display();
        if !spec.description.is_empty() {
            info!(command = %command_line, "{}", spec.description);
        }

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }

        let output = command.output().await.map_err(|source| ProcessError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if spec.silent {
            debug!(command = %command_line, stdout = %stdout.trim(), stderr = %stderr.trim(), "Command finished");
        } else {
            info!(command = %command_line, stdout = %stdout.trim(), "Command finished");
        }

        if !output.status.success() {
            return Err(ProcessError::NonZeroExit {
                command: command_line,
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_program_and_args() {
        let spec = CommandSpec::new("npm", ["install", "left-pad@1.3.0"]);
        assert_eq!(spec.display(), "npm install left-pad@1.3.0");
        assert!(spec.silent);
    }

    #[test]
    fn test_from_argv_requires_program() {
        assert!(CommandSpec::from_argv(&[]).is_none());
        let spec = CommandSpec::from_argv(&["make".to_string(), "all".to_string()]).unwrap();
        assert_eq!(spec.program, "make");
        assert_eq!(spec.args, vec!["all".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout() {
        let temp = tempfile::tempdir().unwrap();
        let spec = CommandSpec::new("sh", ["-c", "pwd && echo done"]).in_dir(temp.path());
        let stdout = SystemCommandRunner.run(&spec).await.unwrap();
        assert!(stdout.contains("done"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_logs_described_verbose_step() {
        let spec = CommandSpec::new("sh", ["-c", "echo installed"])
            .describe("Installing dependencies")
            .verbose();
        let stdout = SystemCommandRunner.run(&spec).await.unwrap();
        assert_eq!(stdout.trim(), "installed");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_non_zero_exit() {
        let spec = CommandSpec::new("sh", ["-c", "echo broken >&2; exit 3"]);
        let err = SystemCommandRunner.run(&spec).await.unwrap_err();
        match err {
            ProcessError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_system_runner_reports_missing_program() {
        let spec = CommandSpec::new("cantrips-definitely-missing-binary", Vec::<String>::new());
        let err = SystemCommandRunner.run(&spec).await.unwrap_err();
        assert!(matches!(err, ProcessError::Spawn { .. }));
    }
}
