//! Post-processing for completed items
//!
//! This module handles the steps that run after the extractor delivers a file:
//! 1. Thumbnail - mux the retrieved thumbnail as an attached picture
//! 2. Chapters - write chapter markers from the extractor's metadata
//! 3. Cleanup - sweep transient artifacts at the end of a run
//!
//! Media rewriting sits behind the [`MediaProcessor`] trait:
//!
//! - [`FfmpegProcessor`]: uses external `ffmpeg` / `ffprobe` binaries
//! - [`NoOpMediaProcessor`]: stub used when ffmpeg is unavailable
//!
//! Failures here never fail an item; the downloader reports them as warnings.

mod chapters;
pub mod cleanup;
mod ffmpeg;
mod noop;
mod scratch;
mod traits;

pub use chapters::render_ffmetadata;
pub use cleanup::{CleanupReport, sweep};
pub use ffmpeg::FfmpegProcessor;
pub use noop::NoOpMediaProcessor;
pub use traits::MediaProcessor;

use crate::config::ToolsConfig;
use std::sync::Arc;

/// Pick the best available media processor for the given tool configuration
///
/// Falls back to [`NoOpMediaProcessor`] when ffmpeg or ffprobe cannot be found.
pub fn detect(tools: &ToolsConfig) -> Arc<dyn MediaProcessor> {
    match FfmpegProcessor::from_config(tools) {
        Some(processor) => Arc::new(processor),
        None => {
            tracing::warn!("ffmpeg/ffprobe not found, thumbnails and chapters will not be embedded");
            Arc::new(NoOpMediaProcessor)
        }
    }
}
