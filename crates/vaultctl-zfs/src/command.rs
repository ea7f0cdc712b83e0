//! Execution wrapper for invoking `zfs`.
//!
//! The goal is to keep shell integration isolated so provider logic stays
//! testable (fake binaries, deterministic stdout parsing).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use vaultctl_core::error::VaultctlResult;

/// One external invocation boundary around the resolved `zfs` binary.
///
/// Calls are fully synchronous and blocking with no timeout and no retry; a
/// hang in the backend blocks the calling operation until the operator
/// intervenes. Spawn failures propagate as errors, nonzero exits do not: they
/// are reported through [`CommandOutput::status`] for the caller to judge.
#[derive(Debug, Clone)]
pub struct ZfsCommand {
    binary: PathBuf,
}

/// Captured result of one completed backend invocation.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ZfsCommand {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Spawn the binary with `args`, feed it `input` when given, wait for
    /// termination, and capture its output.
    pub fn run(&self, args: &[&str], input: Option<&[u8]>) -> VaultctlResult<CommandOutput> {
        let mut command = Command::new(&self.binary);
        command.args(args);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());
        command.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        let mut child = command.spawn()?;

        if let Some(payload) = input {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(payload)?;
                // Dropping the handle closes the pipe.
            }
        }

        let output = child.wait_with_output()?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Spawn the binary with `args` and return without waiting.
    ///
    /// For operations whose outcome the caller does not need to confirm; the
    /// child's output is discarded and its exit status never collected by us.
    pub fn run_detached(&self, args: &[&str]) -> VaultctlResult<()> {
        Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell() -> ZfsCommand {
        ZfsCommand::new(PathBuf::from("/bin/sh"))
    }

    #[test]
    fn captures_stdout_and_exit_status() {
        let out = shell().run(&["-c", "echo hello world"], None).unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout, "hello world\n");
        assert_eq!(out.stderr, "");
    }

    #[test]
    fn captures_stderr_and_nonzero_status() {
        let out = shell().run(&["-c", "echo oops >&2; exit 3"], None).unwrap();
        assert_eq!(out.status, 3);
        assert_eq!(out.stdout, "");
        assert_eq!(out.stderr, "oops\n");
    }

    #[test]
    fn writes_stdin_to_the_child() {
        let out = shell().run(&["-c", "cat"], Some(b"piped input")).unwrap();
        assert_eq!(out.status, 0);
        assert_eq!(out.stdout, "piped input");
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let cmd = ZfsCommand::new(PathBuf::from("/nonexistent/zfs"));
        assert!(cmd.run(&["list"], None).is_err());
    }

    #[test]
    fn detached_spawn_returns_immediately() {
        shell().run_detached(&["-c", "true"]).unwrap();
    }
}
