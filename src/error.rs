//! Error types for the self-upgrade core.
//!
//! Failures during an upgrade attempt are never raised: they are stored on the
//! [`UpgradeResult`](crate::result::UpgradeResult) so the caller decides what
//! to do with them. [`UpgradeError`] covers the surrounding plumbing
//! (configuration files, I/O).

use std::path::PathBuf;
use std::time::Duration;

/// Top-level error type for configuration and I/O around the upgrade core.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// Configuration parse or serialization error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, UpgradeError>;

/// Failure of the external install step.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// The installer executable could not be found on `PATH`.
    #[error("installer `{program}` not found: {reason}")]
    NotFound {
        /// Program name as configured.
        program: String,
        /// Lookup failure description.
        reason: String,
    },

    /// The installer could not be started or waited on.
    #[error("cannot run installer `{program}`: {source}")]
    Spawn {
        /// Program name as configured.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The installer ran and exited unsuccessfully.
    #[error("installer exited with status {}", display_code(.code))]
    Exit {
        /// Exit code, `None` when the process was terminated by a signal.
        code: Option<i32>,
    },

    /// The install was cancelled before it finished.
    #[error("install canceled")]
    Canceled,

    /// The install did not finish within the configured timeout.
    #[error("install deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

impl InstallError {
    /// Returns `true` for cancellation and deadline expiry.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled | Self::DeadlineExceeded(_))
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "signal".to_owned(), |c| c.to_string())
}

/// Failure to read the metadata of the newly installed binary.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The path of the running executable is unknown.
    #[error("cannot determine current executable path: {0}")]
    ExecutablePath(#[source] std::io::Error),

    /// The executable could not be started to report its `--version`.
    #[error("cannot run {}: {source}", .path.display())]
    Launch {
        /// Executable that was run.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `<path> --version` exited unsuccessfully.
    #[error("{} --version exited with status {}", .path.display(), display_code(.code))]
    VersionFailed {
        /// Executable that was run.
        path: PathBuf,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
    },

    /// `<path> --version` did not finish in time and was killed.
    #[error("{} --version did not finish within {timeout:?}", .path.display())]
    VersionTimeout {
        /// Executable that was run.
        path: PathBuf,
        /// Limit that expired.
        timeout: Duration,
    },

    /// The `--version` output carried no recognisable version.
    #[error("no version found in {} --version output", .path.display())]
    Unparseable {
        /// Executable that was run.
        path: PathBuf,
    },
}
