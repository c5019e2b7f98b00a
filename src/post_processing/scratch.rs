//! Drop guard for scratch files created during post-processing

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Removes tracked scratch files when dropped
///
/// Files that no longer exist (for example a scratch container that was
/// renamed over the original) are ignored.
#[derive(Debug, Default)]
pub(crate) struct ScratchGuard {
    paths: Vec<PathBuf>,
}

impl ScratchGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Track `path` for removal; duplicates are ignored
    pub(crate) fn track(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        if !self.paths.iter().any(|p| p == path) {
            self.paths.push(path.to_path_buf());
        }
    }
}

// Blocking removal runs on the async worker; scratch sets are a few small files.
impl Drop for ScratchGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(?path, "removed scratch file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(?path, error = %e, "failed to remove scratch file"),
            }
        }
    }
}
