//! Zip archiving of completed files
//!
//! Completed media files are bundled into numbered zip parts. Each file is
//! stored under its base name, and the sources are deleted once the archive
//! is complete. Files that vanished between completion and archiving are
//! skipped with a warning.

use crate::error::{Error, PostProcessError, Result};
use crate::utils::append_suffix;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix of the in-progress archive; renamed into place once complete
const IN_PROGRESS_SUFFIX: &str = ".part";

/// Entries larger than this need zip64 headers
const ZIP32_LIMIT: u64 = u32::MAX as u64;

/// Result of archiving one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveReport {
    /// The archive written, or `None` when every file was missing
    pub archive: Option<PathBuf>,
    /// Source files stored in the archive
    pub archived: Vec<PathBuf>,
    /// Source files that no longer existed
    pub missing: Vec<PathBuf>,
    /// Archived source files that could not be deleted afterwards
    pub undeleted: Vec<PathBuf>,
}

/// Writes zip archives from completed files
#[derive(Debug, Clone, Copy, Default)]
pub struct Archiver;

impl Archiver {
    /// Create a new archiver
    pub fn new() -> Self {
        Self
    }

    /// Bundle `files` into `output_dir/archive_name` and delete the sources
    ///
    /// The archive is Deflate-compressed, with zip64 entries for files larger
    /// than 4 GiB. If every file is missing no archive is created. If writing
    /// fails, the partial archive is removed, all sources stay in place and
    /// `PostProcessError::ArchiveFailed` is returned. A failed deletion after
    /// a successful write is only logged.
    ///
    /// Runs on the blocking thread pool.
    pub async fn archive(
        &self,
        files: Vec<PathBuf>,
        archive_name: &str,
        output_dir: &Path,
    ) -> Result<ArchiveReport> {
        let archive_path = output_dir.join(archive_name);
        tokio::task::spawn_blocking(move || archive_blocking(files, archive_path))
            .await
            .map_err(|e| Error::Other(format!("archive task failed: {}", e)))?
    }
}

fn archive_blocking(files: Vec<PathBuf>, archive_path: PathBuf) -> Result<ArchiveReport> {
    let mut report = ArchiveReport::default();

    let mut present = Vec::with_capacity(files.len());
    for file in files {
        if file.is_file() {
            present.push(file);
        } else {
            warn!(?file, archive = ?archive_path, "file vanished before archiving, skipping");
            report.missing.push(file);
        }
    }

    if present.is_empty() {
        warn!(archive = ?archive_path, "no files left to archive, archive not created");
        return Ok(report);
    }

    let temp_path = append_suffix(&archive_path, IN_PROGRESS_SUFFIX);
    if let Err(reason) = write_zip(&present, &temp_path) {
        remove_partial(&temp_path);
        return Err(PostProcessError::ArchiveFailed {
            archive: archive_path,
            reason,
        }
        .into());
    }

    std::fs::rename(&temp_path, &archive_path).map_err(|e| {
        remove_partial(&temp_path);
        PostProcessError::ArchiveFailed {
            archive: archive_path.clone(),
            reason: format!("failed to move archive into place: {}", e),
        }
    })?;

    info!(archive = ?archive_path, files = present.len(), "archive created");

    for file in present {
        match std::fs::remove_file(&file) {
            Ok(()) => debug!(?file, "deleted archived source file"),
            Err(e) => {
                warn!(?file, error = %e, "failed to delete archived source file");
                report.undeleted.push(file.clone());
            }
        }
        report.archived.push(file);
    }

    report.archive = Some(archive_path);
    Ok(report)
}

fn remove_partial(temp_path: &Path) {
    if let Err(e) = std::fs::remove_file(temp_path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = ?temp_path, error = %e, "failed to remove partial archive");
    }
}

fn write_zip(files: &[PathBuf], path: &Path) -> std::result::Result<(), String> {
    let file = File::create(path).map_err(|e| format!("failed to create archive: {}", e))?;
    let mut zip = zip::ZipWriter::new(file);

    for source in files {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("{} has no file name", source.display()))?;

        let size = std::fs::metadata(source)
            .map(|m| m.len())
            .map_err(|e| format!("failed to stat {}: {}", source.display(), e))?;

        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated)
            .large_file(size > ZIP32_LIMIT);

        zip.start_file(name.as_str(), options)
            .map_err(|e| format!("failed to add {}: {}", name, e))?;

        let mut reader = File::open(source)
            .map_err(|e| format!("failed to open {}: {}", source.display(), e))?;
        std::io::copy(&mut reader, &mut zip)
            .map_err(|e| format!("failed to write {}: {}", name, e))?;
    }

    zip.finish()
        .map_err(|e| format!("failed to finish archive: {}", e))?;
    Ok(())
}
