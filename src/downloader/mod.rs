//! Single-item downloader
//!
//! Retrieves one [`DownloadItem`] through the [`Extractor`], resolves the
//! final filename, reconciles subtitle sidecars and runs the media
//! post-processing steps. Every failure stays inside the item: the
//! non-raising [`ItemDownloader::download_item`] reports it as an `error`
//! event and yields `None`.

mod subtitles;


use crate::config::Config;
use crate::error::{DownloadError, Result};
use crate::extractor::{ExtractRequest, Extractor, ExtractorProgress};
use crate::post_processing::MediaProcessor;
use crate::retry::retry_with_policy;
use crate::types::{DownloadFormat, DownloadItem, Event, RunOptions, VideoInfo};
use crate::utils::{extension_lowercase, media_path};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub(crate) use subtitles::{find_thumbnail, reconcile_subtitles};

/// Warning emitted before retrying after a signature error
pub const UPGRADE_WARNING: &str = "upgrading extractor after signature error";

/// Downloads and post-processes single items
///
/// Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct ItemDownloader {
    config: Arc<Config>,
    extractor: Arc<dyn Extractor>,
    processor: Arc<dyn MediaProcessor>,
    event_tx: broadcast::Sender<Event>,
}

impl ItemDownloader {
    /// Create a new item downloader
    pub fn new(
        config: Arc<Config>,
        extractor: Arc<dyn Extractor>,
        processor: Arc<dyn MediaProcessor>,
        event_tx: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            config,
            extractor,
            processor,
            event_tx,
        }
    }

    /// Download one item, returning the final media path
    ///
    /// Post-processing failures only produce warnings. The error side covers
    /// extraction failures (after the signature retry policy is exhausted) and
    /// a final file that does not exist.
    pub async fn download(&self, item: &DownloadItem, options: &RunOptions) -> Result<PathBuf> {
        let index = item.index;
        info!(index, url = %item.url, format = %options.format, "starting item");

        let request = self.build_request(item, options);
        let info = self.extract_with_retry(index, &request).await?;

        let final_path =
            resolve_final_path(item, &info, &options.output_dir, options.format).await;
        if !tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            return Err(DownloadError::FileMissing {
                index,
                path: final_path,
            }
            .into());
        }
        debug!(index, path = ?final_path, "resolved final file");

        reconcile_subtitles(&final_path, &self.config.subtitles).await;

        if options.format.supports_muxing() {
            self.embed_thumbnail(index, &final_path).await;
            self.embed_chapters(index, &final_path, &info).await;
        }

        info!(index, path = ?final_path, "item complete");
        self.event_tx
            .send(Event::FinishedVideo {
                index,
                path: final_path.clone(),
                message: format!("finished {}", display_name(&final_path)),
            })
            .ok();

        Ok(final_path)
    }

    /// Download one item, reporting any failure as a single `error` event
    pub async fn download_item(&self, item: &DownloadItem, options: &RunOptions) -> Option<PathBuf> {
        match self.download(item, options).await {
            Ok(path) => Some(path),
            Err(e) => {
                error!(index = item.index, url = %item.url, error = %e, "item failed");
                self.event_tx
                    .send(Event::error(
                        Some(item.index),
                        format!("item {} failed: {}", item.index, e),
                    ))
                    .ok();
                None
            }
        }
    }

    fn build_request(&self, item: &DownloadItem, options: &RunOptions) -> ExtractRequest {
        let template = options
            .output_dir
            .join(format!("{:03}-%(title)s.%(ext)s", item.index));

        let cookie_file = if options.use_auth_cookies {
            let cookies = &self.config.download.cookie_file;
            if cookies.is_file() {
                Some(cookies.clone())
            } else {
                warn!(index = item.index, ?cookies, "cookie file not found, continuing without");
                self.event_tx
                    .send(Event::warning(
                        Some(item.index),
                        format!(
                            "cookie file {} not found, downloading without authentication",
                            cookies.display()
                        ),
                    ))
                    .ok();
                None
            }
        } else {
            None
        };

        ExtractRequest {
            url: item.url.clone(),
            output_template: template.to_string_lossy().into_owned(),
            format: options.format,
            subtitle_languages: self.config.subtitles.languages.clone(),
            subtitle_format: self.config.subtitles.format_preference(),
            write_thumbnail: options.format.wants_thumbnail(),
            cookie_file,
        }
    }

    async fn extract_with_retry(&self, index: u32, request: &ExtractRequest) -> Result<VideoInfo> {
        let event_tx = self.event_tx.clone();
        let progress = move |update: ExtractorProgress| {
            event_tx.send(progress_event(index, update)).ok();
        };

        let extractor = &self.extractor;
        let progress = &progress;
        let policy = &self.config.retry;

        retry_with_policy(
            policy,
            move |attempt| {
                debug!(index, attempt, "invoking extractor");
                extractor.extract(request, progress)
            },
            move |err, next_attempt| {
                warn!(index, error = %err, next_attempt, "{}", UPGRADE_WARNING);
                self.event_tx
                    .send(Event::warning(Some(index), UPGRADE_WARNING))
                    .ok();
                async move {
                    if policy.upgrade_on_signature_error
                        && let Err(e) = extractor.upgrade().await
                    {
                        warn!(index, error = %e, "extractor upgrade failed, retrying anyway");
                    }
                }
            },
        )
        .await
    }

    async fn embed_thumbnail(&self, index: u32, media: &Path) {
        let Some(thumbnail) = find_thumbnail(media).await else {
            debug!(index, ?media, "no thumbnail next to media");
            return;
        };

        self.event_tx
            .send(Event::PostProcessing {
                index,
                message: "embedding thumbnail".into(),
            })
            .ok();

        if let Err(e) = self.processor.embed_thumbnail(media, &thumbnail).await {
            warn!(index, path = ?media, error = %e, "thumbnail not embedded");
            self.event_tx
                .send(Event::warning(
                    Some(index),
                    format!("thumbnail not embedded in {}: {}", display_name(media), e),
                ))
                .ok();
        }
    }

    async fn embed_chapters(&self, index: u32, media: &Path, info: &VideoInfo) {
        if info.chapters.is_empty() {
            return;
        }

        self.event_tx
            .send(Event::PostProcessing {
                index,
                message: format!("embedding {} chapters", info.chapters.len()),
            })
            .ok();

        if let Err(e) = self.processor.embed_chapters(media, &info.chapters).await {
            warn!(index, path = ?media, error = %e, "chapters not embedded");
            self.event_tx
                .send(Event::warning(
                    Some(index),
                    format!("chapters not embedded in {}: {}", display_name(media), e),
                ))
                .ok();
        }
    }
}

/// Final media path for an item
///
/// The extractor's reported path wins when it carries the expected
/// extension. Otherwise the expected extension is substituted on the reported
/// path, since the extractor's own title cleaning keeps characters that
/// [`crate::utils::sanitize_filename`] drops. The path derived from the index
/// and title is used only when no such file exists.
pub(crate) async fn resolve_final_path(
    item: &DownloadItem,
    info: &VideoInfo,
    output_dir: &Path,
    format: DownloadFormat,
) -> PathBuf {
    let ext = format.extension();

    if let Some(reported) = &info.final_path {
        if extension_lowercase(reported).as_deref() == Some(ext) {
            return reported.clone();
        }

        let substituted = reported.with_extension(ext);
        if tokio::fs::try_exists(&substituted).await.unwrap_or(false) {
            return substituted;
        }
        debug!(index = item.index, reported = ?reported, "no file at reported path with expected extension");
    }

    let title = if info.title.is_empty() {
        &item.title
    } else {
        &info.title
    };
    media_path(output_dir, item.index, title, ext)
}

fn progress_event(index: u32, update: ExtractorProgress) -> Event {
    match update {
        ExtractorProgress::Downloading {
            bytes_done,
            bytes_total,
            estimated,
        } => {
            let message = match bytes_total {
                Some(total) if total > 0 => format!(
                    "{:.1}% of {}{}",
                    bytes_done as f64 * 100.0 / total as f64,
                    total,
                    if estimated { " (estimated)" } else { "" }
                ),
                _ => format!("{bytes_done} bytes"),
            };
            Event::Downloading {
                index,
                bytes_done,
                bytes_total,
                estimated,
                message,
            }
        }
        ExtractorProgress::Finished => Event::Finished {
            index,
            message: "download finished, post-processing".into(),
        },
        ExtractorProgress::PostProcessing { name } => Event::PostProcessing {
            index,
            message: format!("running {name}"),
        },
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
