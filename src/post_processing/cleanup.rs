//! End-of-run sweep of transient artifacts

use crate::config::CleanupConfig;
use crate::utils::has_suffix_ignore_case;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What a sweep removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files deleted
    pub removed: Vec<PathBuf>,
    /// Files matching a transient suffix that could not be deleted
    pub failed: Vec<PathBuf>,
}

/// Delete transient artifacts directly inside `output_dir`
///
/// Every regular file whose name ends (case-insensitively) with one of
/// `config.transient_suffixes` is removed. Subdirectories are not entered.
/// Individual failures are logged and skipped, and a missing directory is a
/// no-op.
///
/// # Arguments
///
/// * `output_dir` - Directory to sweep
/// * `config` - Cleanup settings (suffix list)
pub async fn sweep(output_dir: &Path, config: &CleanupConfig) -> CleanupReport {
    use tokio::fs;

    let mut report = CleanupReport::default();

    let mut entries = match fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(?output_dir, "output directory does not exist, skipping cleanup");
            return report;
        }
        Err(e) => {
            warn!(?output_dir, error = %e, "failed to read directory during cleanup");
            return report;
        }
    };

    let mut targets = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let is_file = match entry.file_type().await {
            Ok(ft) => ft.is_file(),
            Err(_) => continue,
        };
        if !is_file {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if config
            .transient_suffixes
            .iter()
            .any(|suffix| has_suffix_ignore_case(name, suffix))
        {
            targets.push(entry.path());
        }
    }

    for file in targets {
        match fs::remove_file(&file).await {
            Ok(()) => {
                debug!(?file, "deleted transient file");
                report.removed.push(file);
            }
            Err(e) => {
                warn!(?file, error = %e, "failed to delete transient file");
                report.failed.push(file);
            }
        }
    }

    info!(
        ?output_dir,
        removed = report.removed.len(),
        failed = report.failed.len(),
        "cleanup complete"
    );

    report
}
