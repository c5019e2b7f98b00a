//! Traits and types for the extraction tool boundary

use crate::types::{DownloadFormat, PlaylistInfo, VideoInfo};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Everything the extractor needs to retrieve one item
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    /// Video URL
    pub url: String,
    /// Output template, e.g. `/out/007-%(title)s.%(ext)s`
    pub output_template: String,
    /// Requested format
    pub format: DownloadFormat,
    /// Subtitle languages, in preference order
    pub subtitle_languages: Vec<String>,
    /// Subtitle encoding preference, e.g. `vtt/srt`
    pub subtitle_format: String,
    /// Retrieve the thumbnail next to the output
    pub write_thumbnail: bool,
    /// Netscape cookie file passed to the site
    pub cookie_file: Option<PathBuf>,
}

/// Progress reported by the extractor while an item is retrieved
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractorProgress {
    /// Bytes retrieved so far
    Downloading {
        /// Bytes retrieved so far
        bytes_done: u64,
        /// Total size, exact or estimated
        bytes_total: Option<u64>,
        /// Whether `bytes_total` is an estimate
        estimated: bool,
    },
    /// A stream finished downloading
    Finished,
    /// One of the extractor's own post-processors is running (merge, audio conversion)
    PostProcessing {
        /// Post-processor name
        name: String,
    },
}

/// Callback receiving progress for the item being extracted
pub type ProgressCallback<'a> = &'a (dyn Fn(ExtractorProgress) + Send + Sync);

/// Trait for the external extraction tool
///
/// The extractor owns network retrieval, format selection, merging and subtitle
/// download. Implementations must classify failures: signature/nsig errors as
/// [`DownloadError::SignatureExtraction`](crate::error::DownloadError::SignatureExtraction),
/// everything else the site reports as
/// [`DownloadError::Extraction`](crate::error::DownloadError::Extraction).
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::extractor::{CliExtractor, Extractor};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = CliExtractor::from_path().expect("yt-dlp not found");
/// let playlist = extractor
///     .resolve_playlist("https://www.youtube.com/playlist?list=PL123", None)
///     .await?;
/// println!("{} entries", playlist.items.len());
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Retrieve one item and report the metadata the downloader needs
    ///
    /// # Arguments
    ///
    /// * `request` - What to fetch and where to put it
    /// * `progress` - Receives progress while the item downloads
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: ProgressCallback<'_>,
    ) -> crate::Result<VideoInfo>;

    /// Expand a playlist URL into entries without downloading them
    ///
    /// Entries the site reports as null are skipped but keep their positional
    /// index, so the remaining items keep stable filenames.
    async fn resolve_playlist(
        &self,
        url: &str,
        cookie_file: Option<&Path>,
    ) -> crate::Result<PlaylistInfo>;

    /// Upgrade the extraction tool in place
    async fn upgrade(&self) -> crate::Result<()>;

    /// Name of this implementation
    fn name(&self) -> &'static str;
}
