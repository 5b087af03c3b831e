//! Scripted [`CommandRunner`] for strategy and registry tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::{CommandRunner, CommandSpec, ProcessError};

/// Records every command and fakes the filesystem effects of `npm install <pkg>@<ver>`.
#[derive(Default)]
pub(crate) struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_on: Option<String>,
    stdout: HashMap<String, String>,
}

impl RecordingRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fail the first command whose display contains `needle`.
    pub(crate) fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Answer commands whose display equals `command` with `stdout`.
    pub(crate) fn with_stdout(mut self, command: &str, stdout: &str) -> Self {
        self.stdout.insert(command.to_string(), stdout.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    pub(crate) fn displays(&self) -> Vec<String> {
        self.calls.lock().iter().map(CommandSpec::display).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandSpec) -> Result<String, ProcessError> {
        self.calls.lock().push(command.clone());
        let display = command.display();

        if let Some(needle) = &self.fail_on
            && display.contains(needle.as_str())
        {
            return Err(ProcessError::NonZeroExit {
                command: display,
                status: "exit status: 1".to_string(),
                stderr: "scripted failure".to_string(),
            });
        }

        if command.program == "npm"
            && command.args.first().map(String::as_str) == Some("install")
            && let (Some(package), Some(cwd)) = (command.args.get(1), &command.cwd)
        {
            let name = package.rsplit_once('@').map(|(n, _)| n).unwrap_or(package);
            let installed = cwd.join("node_modules").join(name);
            std::fs::create_dir_all(&installed).expect("fake npm install");
            std::fs::write(installed.join("package.json"), "{}").expect("fake npm install");
        }

        Ok(self.stdout.get(&display).cloned().unwrap_or_default())
    }
}
