//! Shared test doubles for the extractor and media processor seams.

use crate::error::{DownloadError, Error, PostProcessError};
use crate::extractor::{ExtractRequest, Extractor, ExtractorProgress, ProgressCallback};
use crate::post_processing::MediaProcessor;
use crate::types::{Chapter, DownloadItem, Event, PlaylistInfo, VideoInfo};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

/// Scripted behavior for one URL
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Script {
    /// Write the media file and report success
    Succeed,
    /// Fail with a permanent extraction error
    Fail(String),
    /// Fail with a signature error this many times, then succeed
    SignatureFailures(u32),
    /// Report success without writing the media file
    ReportWithoutFile,
    /// Write `written` but report `reported` as the final path
    ReportsPath { reported: PathBuf, written: PathBuf },
}

/// Extractor double that writes placeholder files into the output template
pub(crate) struct FakeExtractor {
    scripts: HashMap<String, Script>,
    titles: HashMap<String, String>,
    chapters: Vec<Chapter>,
    playlist: Option<PlaylistInfo>,
    delay: Duration,
    write_subtitles: bool,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) requests: Mutex<Vec<ExtractRequest>>,
    pub(crate) upgrades: AtomicU32,
    attempts: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    pub(crate) max_in_flight: AtomicUsize,
}

impl FakeExtractor {
    pub(crate) fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            titles: HashMap::new(),
            chapters: Vec::new(),
            playlist: None,
            delay: Duration::ZERO,
            write_subtitles: false,
            calls: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            upgrades: AtomicU32::new(0),
            attempts: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn script(mut self, url: &str, script: Script) -> Self {
        self.scripts.insert(url.to_string(), script);
        self
    }

    pub(crate) fn title(mut self, url: &str, title: &str) -> Self {
        self.titles.insert(url.to_string(), title.to_string());
        self
    }

    pub(crate) fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = chapters;
        self
    }

    pub(crate) fn with_playlist(mut self, playlist: PlaylistInfo) -> Self {
        self.playlist = Some(playlist);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_subtitles(mut self) -> Self {
        self.write_subtitles = true;
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn title_for(&self, url: &str) -> String {
        self.titles
            .get(url)
            .cloned()
            .unwrap_or_else(|| format!("video {}", url.rsplit('=').next().unwrap_or(url)))
    }

    fn write_outputs(&self, request: &ExtractRequest, title: &str) -> PathBuf {
        let ext = request.format.extension();
        let media = PathBuf::from(
            request
                .output_template
                .replace("%(title)s", title)
                .replace("%(ext)s", ext),
        );
        std::fs::write(&media, format!("media for {}", request.url)).unwrap();
        if request.write_thumbnail {
            std::fs::write(media.with_extension("webp"), b"webp").unwrap();
        }
        if self.write_subtitles {
            std::fs::write(media.with_extension("en.vtt"), b"WEBVTT").unwrap();
            std::fs::write(media.with_extension("en.srt"), b"1").unwrap();
        }
        media
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: ProgressCallback<'_>,
    ) -> crate::Result<VideoInfo> {
        self.calls.lock().unwrap().push(request.url.clone());
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        progress(ExtractorProgress::Downloading {
            bytes_done: 0,
            bytes_total: Some(100),
            estimated: false,
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(request.url.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let script = self
            .scripts
            .get(&request.url)
            .cloned()
            .unwrap_or(Script::Succeed);
        let title = self.title_for(&request.url);

        match script {
            Script::Fail(message) => Err(DownloadError::Extraction {
                url: request.url.clone(),
                message,
            }
            .into()),
            Script::SignatureFailures(n) if attempt <= n => Err(DownloadError::SignatureExtraction {
                url: request.url.clone(),
                message: "ERROR: nsig extraction failed".into(),
            }
            .into()),
            Script::ReportWithoutFile => Ok(VideoInfo {
                title,
                chapters: Vec::new(),
                final_path: None,
            }),
            Script::ReportsPath { reported, written } => {
                std::fs::write(&written, b"media").unwrap();
                Ok(VideoInfo {
                    title,
                    chapters: Vec::new(),
                    final_path: Some(reported),
                })
            }
            _ => {
                let media = self.write_outputs(request, &title);
                progress(ExtractorProgress::Downloading {
                    bytes_done: 100,
                    bytes_total: Some(100),
                    estimated: false,
                });
                progress(ExtractorProgress::Finished);
                Ok(VideoInfo {
                    title,
                    chapters: self.chapters.clone(),
                    final_path: Some(media),
                })
            }
        }
    }

    async fn resolve_playlist(
        &self,
        url: &str,
        _cookie_file: Option<&Path>,
    ) -> crate::Result<PlaylistInfo> {
        self.playlist.clone().ok_or_else(|| {
            DownloadError::PlaylistUnavailable {
                url: url.to_string(),
                reason: "no playlist scripted".into(),
            }
            .into()
        })
    }

    async fn upgrade(&self) -> crate::Result<()> {
        self.upgrades.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Media processor double that records calls and can fail thumbnails for chosen files
pub(crate) struct FakeMediaProcessor {
    fail_thumbnail_containing: Vec<String>,
    pub(crate) thumbnails: Mutex<Vec<PathBuf>>,
    pub(crate) chapters: Mutex<Vec<(PathBuf, usize)>>,
}

impl FakeMediaProcessor {
    pub(crate) fn new() -> Self {
        Self {
            fail_thumbnail_containing: Vec::new(),
            thumbnails: Mutex::new(Vec::new()),
            chapters: Mutex::new(Vec::new()),
        }
    }

    /// Fail `embed_thumbnail` for media whose file name contains `needle`
    pub(crate) fn fail_thumbnail_for(mut self, needle: &str) -> Self {
        self.fail_thumbnail_containing.push(needle.to_string());
        self
    }
}

#[async_trait]
impl MediaProcessor for FakeMediaProcessor {
    async fn embed_thumbnail(&self, media: &Path, thumbnail: &Path) -> crate::Result<()> {
        self.thumbnails.lock().unwrap().push(media.to_path_buf());
        let _ = std::fs::remove_file(thumbnail);

        let name = media.file_name().unwrap().to_string_lossy().into_owned();
        if self
            .fail_thumbnail_containing
            .iter()
            .any(|needle| name.contains(needle.as_str()))
        {
            return Err(Error::PostProcess(PostProcessError::ThumbnailNotEmbedded {
                path: media.to_path_buf(),
            }));
        }
        Ok(())
    }

    async fn embed_chapters(&self, media: &Path, chapters: &[Chapter]) -> crate::Result<()> {
        self.chapters
            .lock()
            .unwrap()
            .push((media.to_path_buf(), chapters.len()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// `count` items with URLs `https://example.com/watch?v={i}` and indices 1..=count
pub(crate) fn items(count: u32) -> Vec<DownloadItem> {
    (1..=count)
        .map(|i| DownloadItem::new(format!("https://example.com/watch?v={i}"), format!("video {i}"), i))
        .collect()
}

/// Drain every event currently buffered in `rx`
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
