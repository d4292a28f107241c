//! Outcome of a single upgrade attempt.

use crate::error::{InstallError, MetadataError};
use crate::gate::SkipReason;
use crate::metadata::{BuildInfoReader, BuildMetadata, ExecutableLocator};
use std::sync::{Arc, OnceLock};

/// Result of one upgrade attempt, skipped or not.
///
/// The current metadata, install error, and skip reason are fixed at
/// construction. The metadata of the newly installed binary is read lazily
/// on the first call to [`new_build_info`](Self::new_build_info) and cached
/// for the lifetime of the value, failures included. Concurrent first callers
/// block until a single read completes and all observe its outcome.
pub struct UpgradeResult {
    current: Option<BuildMetadata>,
    install_error: Option<InstallError>,
    skip_reason: Option<SkipReason>,
    new_info: OnceLock<Result<BuildMetadata, MetadataError>>,
    reader: Arc<dyn BuildInfoReader>,
    locator: Arc<dyn ExecutableLocator>,
}

impl UpgradeResult {
    pub(crate) fn new(
        current: Option<BuildMetadata>,
        install_error: Option<InstallError>,
        skip_reason: Option<SkipReason>,
        reader: Arc<dyn BuildInfoReader>,
        locator: Arc<dyn ExecutableLocator>,
    ) -> Self {
        Self {
            current,
            install_error,
            skip_reason,
            new_info: OnceLock::new(),
            reader,
            locator,
        }
    }

    /// Metadata of the running binary, `None` if it was unreadable.
    pub fn current_metadata(&self) -> Option<&BuildMetadata> {
        self.current.as_ref()
    }

    /// Error from the install step, if it ran and failed or was cancelled.
    pub fn install_error(&self) -> Option<&InstallError> {
        self.install_error.as_ref()
    }

    /// Why the installer was not run, if the attempt was skipped.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        self.skip_reason
    }

    /// Returns `true` if the installed binary reports a different version
    /// than the running one.
    ///
    /// Returns `false` when the current metadata is missing or a development
    /// build, and also when the new metadata cannot be read. In that last case
    /// the upgrade may still have happened; inspect
    /// [`new_build_info`](Self::new_build_info) to tell the two apart.
    pub fn did_upgrade(&self) -> bool {
        let Some(current) = &self.current else {
            return false;
        };
        if current.is_development() {
            return false;
        }
        match self.new_build_info() {
            Ok(new) => new.version != current.version,
            Err(_) => false,
        }
    }

    /// Metadata of the executable now at the running binary's path.
    ///
    /// Resolves the path and reads it on first call only; every later call
    /// returns the cached outcome. The first call blocks on the reader (for
    /// [`VersionCommandReader`](crate::metadata::VersionCommandReader), up to
    /// its timeout), so async callers should use `spawn_blocking`.
    ///
    /// # Errors
    ///
    /// Returns the cached [`MetadataError`] if path resolution or the read
    /// failed.
    pub fn new_build_info(&self) -> Result<&BuildMetadata, &MetadataError> {
        self.new_info.get_or_init(|| self.read_new_info()).as_ref()
    }

    fn read_new_info(&self) -> Result<BuildMetadata, MetadataError> {
        let path = self
            .locator
            .current_executable()
            .map_err(MetadataError::ExecutablePath)?;
        tracing::debug!(path = %path.display(), "reading installed binary metadata");
        self.reader.read_from_path(&path)
    }
}

impl std::fmt::Debug for UpgradeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpgradeResult")
            .field("current", &self.current)
            .field("install_error", &self.install_error)
            .field("skip_reason", &self.skip_reason)
            .field("new_info", &self.new_info.get())
            .finish_non_exhaustive()
    }
}
