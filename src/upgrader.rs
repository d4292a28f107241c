//! Upgrade orchestration.
//!
//! An attempt reads the running binary's metadata, runs it through the
//! [`gate`](crate::gate), builds the install target with the `latest` tag,
//! and runs the installer. Every attempt, skipped or not, produces exactly
//! one [`UpgradeResult`].
//!
//! # Usage
//!
//! ```rust,ignore
//! let upgrader = Upgrader::new(Arc::new(VersionCommandReader::new(Some(build_metadata!()))));
//! let mut rx = upgrader.upgrade_background(cancel.child_token(), "");
//! // ... later
//! if let Some(result) = rx.recv().await && result.did_upgrade() {
//!     tracing::info!("restart to use the new version");
//! }
//! ```

use crate::config::UpgradeConfig;
use crate::error::InstallError;
use crate::gate;
use crate::installer::{Installer, InstallerCommand};
use crate::metadata::{BuildInfoReader, BuildMetadata, CurrentExe, ExecutableLocator};
use crate::result::UpgradeResult;
use crate::target::{LATEST_TAG, install_target};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Runs upgrade attempts against injected capabilities.
#[derive(Clone)]
pub struct Upgrader {
    reader: Arc<dyn BuildInfoReader>,
    locator: Arc<dyn ExecutableLocator>,
    installer: Installer,
}

impl Upgrader {
    /// Create an upgrader using `cargo install` and [`CurrentExe`].
    pub fn new(reader: Arc<dyn BuildInfoReader>) -> Self {
        Self {
            reader,
            locator: Arc::new(CurrentExe),
            installer: Installer::new(InstallerCommand::default()),
        }
    }

    /// Create an upgrader whose installer follows `config`.
    pub fn from_config(config: &UpgradeConfig, reader: Arc<dyn BuildInfoReader>) -> Self {
        let installer =
            Installer::new(config.installer.command()).with_timeout(config.installer.timeout());
        Self::new(reader).with_installer(installer)
    }

    pub fn with_locator(mut self, locator: Arc<dyn ExecutableLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installer = installer;
        self
    }

    /// Attempt an upgrade of the package at `package_path` within the
    /// running binary's module.
    ///
    /// Blocks until the installer exits. Cancelling `cancel` kills the
    /// installer and records [`InstallError::Canceled`] on the result.
    pub async fn upgrade(&self, cancel: &CancellationToken, package_path: &str) -> UpgradeResult {
        let current = self.reader.read_current();

        let checked = gate::check(current.as_ref())
            .map(|meta| install_target(&meta.module, package_path, LATEST_TAG));
        let target = match checked {
            Ok(target) => target,
            Err(reason) => {
                tracing::debug!(%reason, "upgrade skipped");
                return self.result(current, None, Some(reason));
            }
        };

        let install_error = self.installer.install(cancel, &target).await.err();
        self.result(current, install_error, None)
    }

    /// Run [`upgrade`](Self::upgrade) on a spawned task.
    ///
    /// The returned channel receives exactly one result and is then closed.
    /// If `cancel` fires while the attempt is running, the delivered result
    /// may instead be an empty one carrying [`InstallError::Canceled`]; which
    /// of the two arrives is not deterministic.
    ///
    /// Must be called from within a tokio runtime.
    pub fn upgrade_background(
        &self,
        cancel: CancellationToken,
        package_path: impl Into<String>,
    ) -> mpsc::Receiver<UpgradeResult> {
        let (tx, rx) = mpsc::channel(1);
        let upgrader = self.clone();
        let package_path = package_path.into();

        tokio::spawn(async move {
            let result = tokio::select! {
                result = upgrader.upgrade(&cancel, &package_path) => result,
                () = cancel.cancelled() => {
                    tracing::debug!("background upgrade cancelled");
                    upgrader.result(None, Some(InstallError::Canceled), None)
                }
            };
            if tx.send(result).await.is_err() {
                tracing::debug!("upgrade result dropped, receiver closed");
            }
        });

        rx
    }

    fn result(
        &self,
        current: Option<BuildMetadata>,
        install_error: Option<InstallError>,
        skip_reason: Option<gate::SkipReason>,
    ) -> UpgradeResult {
        UpgradeResult::new(
            current,
            install_error,
            skip_reason,
            Arc::clone(&self.reader),
            Arc::clone(&self.locator),
        )
    }
}

impl std::fmt::Debug for Upgrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upgrader")
            .field("installer", &self.installer)
            .finish_non_exhaustive()
    }
}
