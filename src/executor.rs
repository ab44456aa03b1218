use anyhow::{Context, Result};
use colored::*;
use log::debug;
use std::process::{Command, ExitStatus, Stdio};

use crate::report::Reporter;

/// How a launched command ended. Only reported, never turned into an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(i32),
    Signalled,
}

impl From<ExitStatus> for Outcome {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            _ if status.success() => Outcome::Success,
            Some(code) => Outcome::Failed(code),
            None => Outcome::Signalled,
        }
    }
}

/// Runs a final command line. Implemented by the shell, and by recorders in tests.
pub trait Execute {
    fn execute(&self, command_line: &str) -> Result<Outcome>;
}

/// `sh -c <line>`, or `cmd /C <line>` on Windows.
pub(crate) fn shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = Command::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

/// Hands the whole string to the platform shell with inherited stdio.
pub struct CommandExecutor {
    reporter: Reporter,
}

impl CommandExecutor {
    pub fn new(reporter: Reporter) -> Self {
        Self { reporter }
    }
}

impl Execute for CommandExecutor {
    fn execute(&self, command_line: &str) -> Result<Outcome> {
        debug!("spawning shell for: {command_line}");
        self.reporter.rule();

        let status = shell(command_line)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .with_context(|| format!("Failed to execute command: {command_line}"))?;

        self.reporter.rule();

        let outcome = Outcome::from(status);
        match outcome {
            Outcome::Success => self.reporter.success("Command completed successfully"),
            Outcome::Failed(code) => self
                .reporter
                .failure(&format!("Command exited with code {}", code.to_string().red())),
            Outcome::Signalled => self.reporter.failure("Command was terminated by signal"),
        }

        Ok(outcome)
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(Reporter::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_execute_simple_command() {
        let executor = CommandExecutor::new(Reporter::quiet());
        assert_eq!(executor.execute("echo hello >/dev/null").unwrap(), Outcome::Success);
        assert_eq!(
            executor.execute("echo one | grep -q one && test 1 -lt 2").unwrap(),
            Outcome::Success
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_outcome_reports_exit_code() {
        let executor = CommandExecutor::new(Reporter::quiet());
        assert_eq!(executor.execute("exit 3").unwrap(), Outcome::Failed(3));
        assert_eq!(executor.execute("kill -9 $$").unwrap(), Outcome::Signalled);
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_invalid_command() {
        // The shell itself reports the missing binary.
        let executor = CommandExecutor::new(Reporter::quiet());
        let outcome = executor.execute("nonexistent_command_12345 2>/dev/null").unwrap();
        assert_eq!(outcome, Outcome::Failed(127));
    }
}
