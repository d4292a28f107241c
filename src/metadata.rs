//! Build metadata for the running binary and for installed executables.
//!
//! The current process reports its metadata from values baked in at compile
//! time (see [`build_metadata!`](crate::build_metadata)). Any other executable
//! is read by running it with `--version` and parsing the output, which
//! lets the upgrader inspect the binary that an install just put in place.

use crate::error::MetadataError;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Version reported by development builds. Such builds are never upgraded.
pub const DEVELOPMENT_VERSION: &str = "(devel)";

/// Identity and version of a built executable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Module identifier the installer understands (crate name, module path).
    pub module: String,
    /// Version string, or [`DEVELOPMENT_VERSION`].
    pub version: String,
}

impl BuildMetadata {
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            version: version.into(),
        }
    }

    /// Returns `true` if this is a development build.
    pub fn is_development(&self) -> bool {
        self.version == DEVELOPMENT_VERSION
    }
}

/// Builds the [`BuildMetadata`] of the crate invoking the macro.
///
/// Uses `CARGO_PKG_NAME` and `CARGO_PKG_VERSION` of the calling crate. Builds
/// with `debug_assertions` report [`DEVELOPMENT_VERSION`] so that local
/// development binaries never replace themselves.
#[macro_export]
macro_rules! build_metadata {
    () => {
        $crate::metadata::BuildMetadata::new(
            env!("CARGO_PKG_NAME"),
            if cfg!(debug_assertions) {
                $crate::metadata::DEVELOPMENT_VERSION
            } else {
                env!("CARGO_PKG_VERSION")
            },
        )
    };
}

/// Source of build metadata.
pub trait BuildInfoReader: Send + Sync {
    /// Metadata of the running process, `None` if unavailable.
    fn read_current(&self) -> Option<BuildMetadata>;

    /// Metadata of the executable at `path`.
    fn read_from_path(&self, path: &Path) -> Result<BuildMetadata, MetadataError>;
}

/// Resolves the path of the running executable.
pub trait ExecutableLocator: Send + Sync {
    fn current_executable(&self) -> std::io::Result<PathBuf>;
}

/// [`ExecutableLocator`] backed by [`std::env::current_exe`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentExe;

impl ExecutableLocator for CurrentExe {
    fn current_executable(&self) -> std::io::Result<PathBuf> {
        std::env::current_exe()
    }
}

/// How long `<path> --version` may run before it is killed.
pub const DEFAULT_VERSION_TIMEOUT: Duration = Duration::from_secs(10);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default [`BuildInfoReader`].
///
/// The current metadata is fixed at construction. Other executables are read
/// by running `<path> --version`, killed after a timeout
/// ([`DEFAULT_VERSION_TIMEOUT`] unless overridden).
#[derive(Debug, Clone)]
pub struct VersionCommandReader {
    current: Option<BuildMetadata>,
    timeout: Duration,
}

impl VersionCommandReader {
    pub fn new(current: Option<BuildMetadata>) -> Self {
        Self {
            current,
            timeout: DEFAULT_VERSION_TIMEOUT,
        }
    }

    /// Kill `--version` runs that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `<path> --version` and collect stdout, bounded by the timeout.
    fn run_version(&self, path: &Path) -> Result<Vec<u8>, MetadataError> {
        let launch_error = |source| MetadataError::Launch {
            path: path.to_owned(),
            source,
        };
        let mut child = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(launch_error)?;

        // Drain stdout off-thread so a chatty child never blocks on a full pipe.
        let (tx, rx) = mpsc::channel();
        if let Some(mut stdout) = child.stdout.take() {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stdout.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
        }

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() < deadline => std::thread::sleep(POLL_INTERVAL),
                Ok(None) => {
                    kill_and_reap(&mut child, path);
                    tracing::debug!(
                        path = %path.display(),
                        timeout = ?self.timeout,
                        "version command timed out"
                    );
                    return Err(MetadataError::VersionTimeout {
                        path: path.to_owned(),
                        timeout: self.timeout,
                    });
                }
                Err(source) => {
                    kill_and_reap(&mut child, path);
                    return Err(launch_error(source));
                }
            }
        };

        if !status.success() {
            return Err(MetadataError::VersionFailed {
                path: path.to_owned(),
                code: status.code(),
            });
        }

        // A descendant may still hold stdout open; the deadline covers it too.
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(buf) => Ok(buf),
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
            Err(RecvTimeoutError::Timeout) => Err(MetadataError::VersionTimeout {
                path: path.to_owned(),
                timeout: self.timeout,
            }),
        }
    }
}

fn kill_and_reap(child: &mut Child, path: &Path) {
    if let Err(e) = child.kill() {
        tracing::debug!(path = %path.display(), error = %e, "version command kill failed");
    }
    if let Err(e) = child.wait() {
        tracing::debug!(path = %path.display(), error = %e, "version command reap failed");
    }
}

impl BuildInfoReader for VersionCommandReader {
    fn read_current(&self) -> Option<BuildMetadata> {
        self.current.clone()
    }

    fn read_from_path(&self, path: &Path) -> Result<BuildMetadata, MetadataError> {
        let stdout = self.run_version(path)?;
        let stdout = String::from_utf8_lossy(&stdout);
        let mut metadata = parse_version_output(&stdout).ok_or_else(|| {
            MetadataError::Unparseable {
                path: path.to_owned(),
            }
        })?;

        if metadata.module.is_empty() {
            metadata.module = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        tracing::debug!(
            path = %path.display(),
            module = %metadata.module,
            version = %metadata.version,
            "read executable version"
        );
        Ok(metadata)
    }
}

/// Parse `--version` output into metadata.
///
/// Scans lines for the first version-like token (`1.2`, `v1.2.3`,
/// `1.2.3-rc.1+build`, or [`DEVELOPMENT_VERSION`]). Words preceding the token
/// on the same line become the module identifier, minus labels such as
/// `version` or `v`, so the module may be empty.
pub fn parse_version_output(output: &str) -> Option<BuildMetadata> {
    for line in output.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        for (idx, word) in words.iter().enumerate() {
            if let Some(version) = version_token(word) {
                let module: Vec<&str> = words[..idx]
                    .iter()
                    .copied()
                    .filter(|w| !is_version_label(w))
                    .collect();
                return Some(BuildMetadata::new(module.join(" "), version));
            }
        }
    }
    None
}

fn is_version_label(word: &str) -> bool {
    let word = word.trim_end_matches([':', ',']);
    ["version", "ver", "v"]
        .iter()
        .any(|label| word.eq_ignore_ascii_case(label))
}

fn version_token(word: &str) -> Option<&str> {
    if word == DEVELOPMENT_VERSION {
        return Some(word);
    }
    let candidate = word.strip_prefix('v').unwrap_or(word);
    let core = candidate
        .split(['-', '+'])
        .next()
        .unwrap_or(candidate);
    let numeric = core
        .split('.')
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    (numeric && core.split('.').count() >= 2).then_some(candidate)
}
