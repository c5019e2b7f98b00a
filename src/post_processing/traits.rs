//! Trait for media post-processing (cover art and chapter markers)

use crate::types::Chapter;
use async_trait::async_trait;
use std::path::Path;

/// Trait for post-processing finished media files
///
/// Both operations rewrite the media in place through a scratch container
/// and leave the original untouched when they fail. Callers treat every error
/// as a soft failure: the item is still delivered.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::post_processing::{FfmpegProcessor, MediaProcessor};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let processor = FfmpegProcessor::from_path().expect("ffmpeg not found");
/// processor
///     .embed_thumbnail(Path::new("001-clip.mp4"), Path::new("001-clip.webp"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Mux `thumbnail` into `media` as an attached picture
    ///
    /// The thumbnail file is consumed: it is removed whether or not embedding
    /// succeeds.
    async fn embed_thumbnail(&self, media: &Path, thumbnail: &Path) -> crate::Result<()>;

    /// Write chapter markers into `media`
    ///
    /// An empty `chapters` slice is a no-op success.
    async fn embed_chapters(&self, media: &Path, chapters: &[Chapter]) -> crate::Result<()>;

    /// Name of this implementation
    fn name(&self) -> &'static str;
}
