//! Error types for playlist-dl
//!
//! This module provides the error taxonomy for the library:
//! - Domain-specific error types (Download, PostProcess)
//! - Context information (item index, file path, offending tool)
//!
//! Item-level failures never cross the item boundary: the single-item
//! downloader converts them into events and an absent result. The `Err` side
//! of the orchestrator's API is reserved for configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for playlist-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for playlist-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "worker_count")
        key: Option<String>,
    },

    /// Download-related error
    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    /// Post-processing error (thumbnail, chapters, archive)
    #[error("post-processing error: {0}")]
    PostProcess(#[from] PostProcessError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed to start or was killed
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Download-related errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Transient signature/nsig extraction failure; retried after upgrading the extractor
    #[error("signature extraction failed for {url}: {message}")]
    SignatureExtraction {
        /// The URL being downloaded
        url: String,
        /// Message reported by the extractor
        message: String,
    },

    /// Permanent extraction failure; the item is skipped
    #[error("extraction failed for {url}: {message}")]
    Extraction {
        /// The URL being downloaded
        url: String,
        /// Message reported by the extractor
        message: String,
    },

    /// The extractor reported success but the expected output file is absent
    #[error("item {index} finished but {path} does not exist")]
    FileMissing {
        /// Sequence index of the item
        index: u32,
        /// The path where the file was expected
        path: PathBuf,
    },

    /// The playlist could not be resolved into entries
    #[error("playlist {url} unavailable: {reason}")]
    PlaylistUnavailable {
        /// The playlist URL
        url: String,
        /// Why resolution failed
        reason: String,
    },
}

impl DownloadError {
    /// Whether this failure belongs to the transient signature/nsig class
    pub fn is_signature_error(&self) -> bool {
        matches!(self, DownloadError::SignatureExtraction { .. })
    }
}

/// Post-processing errors (thumbnail embedding, chapters, archiving)
#[derive(Debug, Error)]
pub enum PostProcessError {
    /// An external media tool exited unsuccessfully
    #[error("{tool} failed on {path}: {reason}")]
    ToolFailed {
        /// Name of the tool (ffmpeg, ffprobe)
        tool: String,
        /// The media file being processed
        path: PathBuf,
        /// Exit status or stderr summary
        reason: String,
    },

    /// The muxed thumbnail stream carried no packets
    #[error("thumbnail stream in {path} is empty")]
    ThumbnailNotEmbedded {
        /// The media file that was left untouched
        path: PathBuf,
    },

    /// Archive creation failed
    #[error("failed to create archive {archive}: {reason}")]
    ArchiveFailed {
        /// The archive being written
        archive: PathBuf,
        /// The reason creation failed
        reason: String,
    },
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub(crate) fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
