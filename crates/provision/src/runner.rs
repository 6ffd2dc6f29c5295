//! Command execution abstraction.
//!
//! The [`CommandRunner`] trait separates building a command from running
//! it, so installers can be exercised against a scripted runner in tests.

use crate::error::{Error, Result};
use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

/// A program invocation with optional standard input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            stdin: None,
        }
    }

    /// Shorthand for a `sudo <program>` invocation.
    pub fn sudo(program: &str) -> Self {
        Self::new("sudo").arg(program)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Feed `input` on standard input. Never shown in [`Display`](fmt::Display).
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arg_list(&self) -> &[String] {
        &self.args
    }

    pub fn stdin_data(&self) -> Option<&str> {
        self.stdin.as_deref()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful output with the given stdout.
    pub fn ok(stdout: &str) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            status: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Turn an unsuccessful exit into [`Error::CommandFailed`].
    pub fn check(self, spec: &CommandSpec) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::CommandFailed {
                command: spec.to_string(),
                status: self.status,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// Runs commands on the host.
///
/// Implementations must not treat a non-zero exit as an error; callers
/// decide what a failure means (an absent user, an inactive service).
pub trait CommandRunner: Send + Sync + fmt::Debug {
    /// Run the command to completion and capture its output.
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runner backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let spawn_err = |source| Error::Spawn {
            command: spec.to_string(),
            source,
        };

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(input) = &spec.stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input.as_bytes()).map_err(spawn_err)?;
        }

        let output = child.wait_with_output().map_err(spawn_err)?;
        Ok(CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_never_includes_stdin() {
        let spec = CommandSpec::sudo("chpasswd").stdin("ops:hunter2");
        assert_eq!(spec.to_string(), "sudo chpasswd");
        assert_eq!(spec.stdin_data(), Some("ops:hunter2"));
    }

    #[test]
    fn test_check_maps_failure() {
        let spec = CommandSpec::new("pacman").args(["-Q", "vault"]);
        let err = CommandOutput::failed(1, "error: package 'vault' was not found\n")
            .check(&spec)
            .unwrap_err();
        match err {
            Error::CommandFailed { command, status, stderr } => {
                assert_eq!(command, "pacman -Q vault");
                assert_eq!(status, Some(1));
                assert_eq!(stderr, "error: package 'vault' was not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(CommandOutput::ok("").check(&spec).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_pipes_stdin() {
        let out = SystemRunner
            .output(&CommandSpec::new("cat").stdin("hello"))
            .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "hello");

        let out = SystemRunner.output(&CommandSpec::new("false")).unwrap();
        assert!(!out.success());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let err = SystemRunner
            .output(&CommandSpec::new("definitely-not-a-real-program-xyz"))
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }
}
