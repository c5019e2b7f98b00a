//! No-op media processor for graceful degradation

use super::traits::MediaProcessor;
use crate::types::Chapter;
use async_trait::async_trait;
use std::path::Path;

/// No-op media processor used when ffmpeg is unavailable
///
/// Every operation returns `Error::NotSupported`, which the downloader turns
/// into a warning. Items are still delivered, just without cover art or
/// chapter markers. Empty chapter lists still succeed since there is nothing
/// to do.
///
/// # Examples
///
/// ```
/// use playlist_dl::post_processing::{MediaProcessor, NoOpMediaProcessor};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() {
/// let processor = NoOpMediaProcessor;
/// let result = processor
///     .embed_thumbnail(Path::new("001-clip.mp4"), Path::new("001-clip.webp"))
///     .await;
/// assert!(result.is_err());
/// assert!(processor.embed_chapters(Path::new("001-clip.mp4"), &[]).await.is_ok());
/// # }
/// ```
pub struct NoOpMediaProcessor;

#[async_trait]
impl MediaProcessor for NoOpMediaProcessor {
    async fn embed_thumbnail(&self, _media: &Path, _thumbnail: &Path) -> crate::Result<()> {
        Err(crate::Error::NotSupported(
            "thumbnail embedding requires an external ffmpeg binary. \
             Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    async fn embed_chapters(&self, _media: &Path, chapters: &[Chapter]) -> crate::Result<()> {
        if chapters.is_empty() {
            return Ok(());
        }
        Err(crate::Error::NotSupported(
            "chapter embedding requires an external ffmpeg binary. \
             Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
