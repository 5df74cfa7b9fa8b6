//! Base node command client.
//!
//! Holds the session's network/era selection and the binary location, builds
//! argument lists and runs them through a [`CommandRunner`]. Typed commands
//! live in the `query`, `keys`, `certificates` and `transaction` modules.

use crate::error::NodeError;
use crate::runner::{CommandRunner, ProcessRunner};
use adakit_types::constants::SOCKET_PATH_ENV;
use adakit_types::{Era, Network, SessionConfig};
use std::path::{Path, PathBuf};

/// Argument list under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs(Vec<String>);

impl CliArgs {
    /// Start with a subcommand path such as `["transaction", "build-raw"]`.
    pub fn new(subcommand: &[&str]) -> Self {
        Self(subcommand.iter().map(|s| s.to_string()).collect())
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.0.push(value.into());
        self
    }

    pub fn flag(mut self, name: &str, value: impl ToString) -> Self {
        self.0.push(name.to_string());
        self.0.push(value.to_string());
        self
    }

    pub fn path(self, name: &str, path: &Path) -> Self {
        self.flag(name, path.display())
    }

    /// Repeat `name value` once per value.
    pub fn repeated<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for value in values {
            self.0.push(name.to_string());
            self.0.push(value.to_string());
        }
        self
    }

    pub fn extend(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.0.extend(args);
        self
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// Async client for the node command-line interface.
pub struct NodeCli<R = ProcessRunner> {
    runner: R,
    cli_path: PathBuf,
    network: Network,
    era: Option<Era>,
}

impl NodeCli<ProcessRunner> {
    /// Client spawning the configured binary, exporting the socket path if set.
    pub fn from_config(config: &SessionConfig) -> Self {
        let mut runner = ProcessRunner::new();
        if let Some(ref socket) = config.socket_path {
            runner = runner.with_env(SOCKET_PATH_ENV, socket.as_os_str());
        }
        Self::new(config, runner)
    }
}

impl<R: CommandRunner> NodeCli<R> {
    pub fn new(config: &SessionConfig, runner: R) -> Self {
        Self {
            runner,
            cli_path: config.cli_path.clone(),
            network: config.network,
            era: config.era,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Network selection flags.
    pub fn network_args(&self) -> Vec<String> {
        self.network.cli_args()
    }

    /// Era flag, empty when no era is configured.
    pub fn era_args(&self) -> Vec<String> {
        self.era.map(|e| vec![e.cli_flag()]).unwrap_or_default()
    }

    /// Run a command and return its stdout.
    pub async fn run(&self, args: CliArgs) -> Result<String, NodeError> {
        let args = args.into_vec();
        let command = format!("{} {}", self.cli_path.display(), args.join(" "));
        log::debug!("node: {}", command);

        let output = self
            .runner
            .run(&self.cli_path, &args)
            .await
            .map_err(|e| NodeError::Spawn {
                program: self.cli_path.display().to_string(),
                source: e,
            })?;

        if !output.success {
            log::warn!("node command failed: {}: {}", command, output.stderr.trim());
            return Err(NodeError::Failed {
                command,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    /// Run a command that writes `out_file`.
    ///
    /// On failure, or if the command exits cleanly without producing the
    /// file, anything left at `out_file` is removed so no half-written
    /// artifact survives.
    pub async fn run_producing(&self, args: CliArgs, out_file: &Path) -> Result<(), NodeError> {
        let result = match self.run(args).await {
            Ok(_) => {
                if tokio::fs::try_exists(out_file).await.unwrap_or(false) {
                    Ok(())
                } else {
                    Err(NodeError::Parse(format!(
                        "command reported success but wrote no {}",
                        out_file.display()
                    )))
                }
            }
            Err(e) => Err(e),
        };

        if result.is_err() {
            let _ = tokio::fs::remove_file(out_file).await;
        }
        result
    }
}

/// Collapse whitespace and return the first token of a single-value response.
pub(crate) fn first_token(stdout: &str) -> Option<&str> {
    stdout.split_whitespace().next()
}

/// Parse JSON stdout, naming the command in the error.
pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    stdout: &str,
    context: &str,
) -> Result<T, NodeError> {
    serde_json::from_str(stdout).map_err(|e| NodeError::Json {
        context: context.to_string(),
        source: e,
    })
}
