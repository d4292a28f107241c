//! Decides whether an upgrade attempt should run.

use crate::metadata::BuildMetadata;

/// Why an upgrade attempt was skipped without running the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The running binary carries no readable build metadata.
    MetadataUnavailable,
    /// The running binary is a development build.
    DevelopmentBuild,
    /// The metadata has no module identifier to install from.
    MissingModuleIdentifier,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MetadataUnavailable => write!(f, "build metadata unavailable"),
            Self::DevelopmentBuild => write!(f, "development build"),
            Self::MissingModuleIdentifier => write!(f, "missing module identifier"),
        }
    }
}

/// Returns the metadata to upgrade from, or the reason to skip.
pub fn check(current: Option<&BuildMetadata>) -> Result<&BuildMetadata, SkipReason> {
    let current = current.ok_or(SkipReason::MetadataUnavailable)?;
    if current.is_development() {
        return Err(SkipReason::DevelopmentBuild);
    }
    if current.module.is_empty() {
        return Err(SkipReason::MissingModuleIdentifier);
    }
    Ok(current)
}
