//! Test doubles built on the public extractor and media processor traits

use async_trait::async_trait;
use playlist_dl::{
    Chapter, DownloadError, DownloadItem, ExtractRequest, Extractor, ExtractorProgress,
    MediaProcessor, PlaylistInfo, VideoInfo,
};
use playlist_dl::extractor::ProgressCallback;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Extractor that writes a placeholder media file and thumbnail per request
pub struct ScriptedExtractor {
    failing: HashSet<String>,
    playlist: Option<PlaylistInfo>,
    delay: Duration,
    pub started: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            playlist: None,
            delay: Duration::ZERO,
            started: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request for `url` with a permanent extraction error
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn with_playlist(mut self, playlist: PlaylistInfo) -> Self {
        self.playlist = Some(playlist);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: ProgressCallback<'_>,
    ) -> playlist_dl::Result<VideoInfo> {
        self.started.lock().unwrap().push(request.url.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.failing.contains(&request.url) {
            return Err(DownloadError::Extraction {
                url: request.url.clone(),
                message: "ERROR: This video is private".into(),
            }
            .into());
        }

        let id = request.url.rsplit('=').next().unwrap_or("x");
        let title = format!("clip {id}");
        let media = PathBuf::from(
            request
                .output_template
                .replace("%(title)s", &title)
                .replace("%(ext)s", request.format.extension()),
        );
        std::fs::write(&media, format!("media {id}")).unwrap();
        if request.write_thumbnail {
            std::fs::write(media.with_extension("jpg"), b"jpg").unwrap();
        }

        progress(ExtractorProgress::Downloading {
            bytes_done: 10,
            bytes_total: Some(10),
            estimated: false,
        });
        progress(ExtractorProgress::Finished);

        Ok(VideoInfo {
            title,
            chapters: Vec::new(),
            final_path: Some(media),
        })
    }

    async fn resolve_playlist(
        &self,
        url: &str,
        _cookie_file: Option<&Path>,
    ) -> playlist_dl::Result<PlaylistInfo> {
        self.playlist.clone().ok_or_else(|| {
            DownloadError::PlaylistUnavailable {
                url: url.to_string(),
                reason: "playlist does not exist".into(),
            }
            .into()
        })
    }

    async fn upgrade(&self) -> playlist_dl::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Media processor that leaves media untouched and consumes the thumbnail
pub struct PassthroughProcessor;

#[async_trait]
impl MediaProcessor for PassthroughProcessor {
    async fn embed_thumbnail(&self, _media: &Path, thumbnail: &Path) -> playlist_dl::Result<()> {
        tokio::fs::remove_file(thumbnail).await?;
        Ok(())
    }

    async fn embed_chapters(&self, _media: &Path, _chapters: &[Chapter]) -> playlist_dl::Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

/// `count` items with URLs `https://video.example/watch?v={i}` and indices 1..=count
pub fn playlist_items(count: u32) -> Vec<DownloadItem> {
    (1..=count)
        .map(|i| DownloadItem::new(format!("https://video.example/watch?v={i}"), format!("clip {i}"), i))
        .collect()
}
