//! Subprocess execution seam.
//!
//! [`NodeCli`](crate::NodeCli) never spawns processes itself; it hands the
//! program and argument list to a [`CommandRunner`]. [`ProcessRunner`] runs
//! the real binary; `FakeNode` (behind the `fake` feature) emulates it
//! in-process.

use std::ffi::OsString;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;

/// Captured result of one finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    /// Exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Runs a program to completion and captures its output.
pub trait CommandRunner: Send + Sync {
    fn run(
        &self,
        program: &Path,
        args: &[String],
    ) -> impl Future<Output = std::io::Result<CommandOutput>> + Send;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    envs: Vec<(OsString, OsString)>,
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an environment variable for every spawned process.
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[String]) -> std::io::Result<CommandOutput> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .envs(self.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .output()
            .await?;

        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_runner_captures_output() {
        let runner = ProcessRunner::new().with_env("ADAKIT_PROBE", "42");
        let out = runner
            .run(
                Path::new("sh"),
                &["-c".to_string(), "echo $ADAKIT_PROBE; echo oops >&2; exit 3".to_string()],
            )
            .await
            .unwrap();
        assert!(!out.success);
        assert_eq!(out.code, Some(3));
        assert_eq!(out.stdout.trim(), "42");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_process_runner_missing_binary() {
        let runner = ProcessRunner::new();
        let result = runner
            .run(Path::new("/nonexistent/adakit-node-binary"), &[])
            .await;
        assert!(result.is_err());
    }
}
