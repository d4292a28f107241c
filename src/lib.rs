//! selfup: in-place self-upgrade for installed binaries.
//!
//! A running executable asks an external installer (`cargo install` by
//! default) for the newest published build of its own package, then inspects
//! the binary now sitting at its path to tell whether the version changed.
//!
//! # Architecture
//!
//! - **Metadata**: build identity of the running binary and `--version`
//!   probing of installed ones
//! - **Gate**: skips development builds and binaries without metadata
//! - **Target**: joins module, package path, and `@latest`
//! - **Installer**: runs the toolchain with output suppressed, cancellable
//! - **Upgrader**: composes the above, synchronously or on a spawned task
//! - **Result**: attempt outcome with a lazily read, cached view of the new binary
//!
//! The library reports every failure on the returned [`UpgradeResult`] and
//! never installs a tracing subscriber of its own.

pub mod config;
pub mod error;
pub mod gate;
pub mod installer;
pub mod metadata;
pub mod result;
pub mod target;
pub mod upgrader;

pub use config::UpgradeConfig;
pub use error::{InstallError, MetadataError, Result, UpgradeError};
pub use gate::SkipReason;
pub use installer::{Installer, InstallerCommand, ProcessRunner, TargetStyle, TokioProcessRunner};
pub use metadata::{
    BuildInfoReader, BuildMetadata, CurrentExe, DEFAULT_VERSION_TIMEOUT, DEVELOPMENT_VERSION,
    ExecutableLocator, VersionCommandReader,
};
pub use result::UpgradeResult;
pub use target::{LATEST_TAG, install_target};
pub use upgrader::Upgrader;
