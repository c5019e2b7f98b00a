//! # playlist-dl
//!
//! Library for downloading single videos or whole playlists through an
//! external extraction tool.
//!
//! ## Design Philosophy
//!
//! playlist-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events, no polling required
//! - **Tool-agnostic at the seams** - yt-dlp and ffmpeg sit behind traits
//!
//! Completed files are bundled into numbered zip parts while the run is still
//! going, and transient artifacts are swept at the end.
//!
//! ## Quick Start
//!
//! ```no_run
//! use playlist_dl::{Config, DownloadFormat, PlaylistDownloader, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.download.worker_count = 3;
//!     config.download.format = DownloadFormat::Video720p;
//!
//!     let downloader = PlaylistDownloader::new(config.clone())?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let options = RunOptions::from_config(&config, "");
//!     let summary = downloader
//!         .download_playlist("https://www.youtube.com/playlist?list=PL123", options)
//!         .await?;
//!     println!("{} items done", summary.succeeded);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Zip archiving of completed files
pub mod archive;
/// Configuration types
pub mod config;
/// Single-item download and post-processing
pub mod downloader;
/// Error types
pub mod error;
/// External extraction tool boundary
pub mod extractor;
/// Playlist orchestration
pub mod orchestrator;
/// Post-processing pipeline
pub mod post_processing;
/// Retry logic for signature extraction failures
pub mod retry;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::{ArchiveReport, Archiver};
pub use config::{
    ArchiveConfig, CleanupConfig, Config, DownloadConfig, SignatureRetryPolicy, SubtitleConfig,
    ToolsConfig,
};
pub use downloader::ItemDownloader;
pub use error::{DownloadError, Error, PostProcessError, Result};
pub use extractor::{CliExtractor, ExtractRequest, Extractor, ExtractorProgress};
pub use orchestrator::PlaylistDownloader;
pub use post_processing::{FfmpegProcessor, MediaProcessor, NoOpMediaProcessor};
pub use types::{
    Chapter, DownloadFormat, DownloadItem, Event, PlaylistInfo, RunOptions, RunSummary, VideoInfo,
};
pub use utils::sanitize_filename;

/// Cancel the downloader's current run when a termination signal arrives
///
/// Listens for Ctrl+C everywhere and additionally for SIGTERM on Unix.
///
/// Items already in flight finish, the rest are skipped and the run still
/// ends with `all_finished`.
///
/// # Example
///
/// ```no_run
/// use playlist_dl::{Config, PlaylistDownloader, RunOptions, cancel_on_signal};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let downloader = Arc::new(PlaylistDownloader::new(config.clone())?);
///     tokio::spawn(cancel_on_signal(downloader.clone()));
///
///     let options = RunOptions::from_config(&config, "");
///     downloader
///         .download_single("https://www.youtube.com/watch?v=abc", options)
///         .await?;
///     Ok(())
/// }
/// ```
pub async fn cancel_on_signal(downloader: std::sync::Arc<PlaylistDownloader>) {
    wait_for_signal().await;
    downloader.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // registration may fail in restricted environments (containers, tests)
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM, cancelling run"),
                _ = ctrl_c() => {}
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not register SIGTERM handler, waiting for Ctrl+C only");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await;
}

/// Resolves on Ctrl+C; never resolves if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C, run will not be cancelled by signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("received Ctrl+C, cancelling run");
}
