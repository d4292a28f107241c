//! External installer invocation.
//!
//! The installer is an external toolchain command (`cargo install` by
//! default) run with the install target as its final argument. Its standard
//! streams are discarded. Cancelling the token passed to
//! [`Installer::install`] kills the child process.

use crate::error::InstallError;
use crate::target::LATEST_TAG;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs an external process to completion.
///
/// Implementations must discard the child's stdout/stderr and kill it when
/// `cancel` fires, returning [`InstallError::Canceled`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<(), InstallError>;
}

/// [`ProcessRunner`] spawning real processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        cancel: &CancellationToken,
        program: &str,
        args: &[String],
    ) -> Result<(), InstallError> {
        let resolved = which::which(program).map_err(|e| InstallError::NotFound {
            program: program.to_owned(),
            reason: e.to_string(),
        })?;

        let mut child = tokio::process::Command::new(&resolved)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| InstallError::Spawn {
                program: program.to_owned(),
                source,
            })?;

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = cancel.cancelled() => None,
        };

        let Some(status) = waited else {
            // kill() also reaps the child.
            if let Err(e) = child.kill().await {
                tracing::debug!(program, error = %e, "installer kill failed");
            }
            tracing::debug!(program, "installer killed on cancellation");
            return Err(InstallError::Canceled);
        };

        let status = status.map_err(|source| InstallError::Spawn {
            program: program.to_owned(),
            source,
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(InstallError::Exit {
                code: status.code(),
            })
        }
    }
}

/// How an install target is handed to the installer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStyle {
    /// `cargo install`: the crate is the last path segment. The `latest` tag
    /// is dropped since cargo installs the newest release of a bare crate
    /// name and rejects `@latest`; other tags stay as `crate@tag`.
    #[default]
    Cargo,
    /// Pass `module/path@tag` through unchanged (e.g. `go install`).
    Verbatim,
}

impl TargetStyle {
    /// Rewrite `target` into the installer's argument form.
    pub fn render(self, target: &str) -> String {
        match self {
            Self::Verbatim => target.to_owned(),
            Self::Cargo => {
                let (path, tag) = target.rsplit_once('@').unwrap_or((target, ""));
                let krate = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(path);
                if tag.is_empty() || tag == LATEST_TAG {
                    krate.to_owned()
                } else {
                    format!("{krate}@{tag}")
                }
            }
        }
    }
}

/// Installer program and leading arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerCommand {
    /// Executable name or path, looked up on `PATH`.
    pub program: String,
    /// Arguments placed before the install target.
    pub args: Vec<String>,
    /// Form of the final target argument.
    pub target_style: TargetStyle,
}

impl Default for InstallerCommand {
    fn default() -> Self {
        Self {
            program: "cargo".to_owned(),
            args: vec!["install".to_owned()],
            target_style: TargetStyle::Cargo,
        }
    }
}

impl InstallerCommand {
    /// Full argument list for `target`.
    pub fn args_for(&self, target: &str) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(self.target_style.render(target));
        args
    }
}

/// Runs the installer command against a target.
#[derive(Clone)]
pub struct Installer {
    runner: Arc<dyn ProcessRunner>,
    command: InstallerCommand,
    timeout: Option<Duration>,
}

impl Installer {
    pub fn new(command: InstallerCommand) -> Self {
        Self {
            runner: Arc::new(TokioProcessRunner),
            command,
            timeout: None,
        }
    }

    /// Replace the process runner (tests use a fake that spawns nothing).
    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Bound every install by `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn command(&self) -> &InstallerCommand {
        &self.command
    }

    /// Install `target`.
    ///
    /// # Errors
    ///
    /// Returns the runner's error verbatim, or
    /// [`InstallError::DeadlineExceeded`] when the timeout expires first.
    pub async fn install(
        &self,
        cancel: &CancellationToken,
        target: &str,
    ) -> Result<(), InstallError> {
        let program = self.command.program.as_str();
        let args = self.command.args_for(target);
        tracing::debug!(program, target, "running installer");

        let Some(timeout) = self.timeout else {
            let outcome = self.runner.run(cancel, program, &args).await;
            log_outcome(program, &outcome);
            return outcome;
        };

        let scoped = cancel.child_token();
        let mut run = self.runner.run(&scoped, program, &args);
        tokio::select! {
            outcome = &mut run => {
                log_outcome(program, &outcome);
                return outcome;
            }
            () = tokio::time::sleep(timeout) => {}
        }

        scoped.cancel();
        // Let the runner kill and reap the child before reporting.
        log_outcome(program, &run.await);
        tracing::debug!(program, ?timeout, "installer deadline exceeded");
        Err(InstallError::DeadlineExceeded(timeout))
    }
}

fn log_outcome(program: &str, outcome: &Result<(), InstallError>) {
    match outcome {
        Ok(()) => tracing::debug!(program, "installer finished"),
        Err(e) => tracing::debug!(program, error = %e, "installer failed"),
    }
}

impl std::fmt::Debug for Installer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installer")
            .field("command", &self.command)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
