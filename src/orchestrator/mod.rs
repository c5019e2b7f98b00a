//! Playlist orchestrator
//!
//! [`PlaylistDownloader`] is the main entry point. It fans items out across a
//! bounded worker pool, drains completions on a single task, batches completed
//! files into numbered zip parts, sweeps transient artifacts and finally emits
//! exactly one `all_finished` event.

mod batching;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::archive::Archiver;
use crate::config::Config;
use crate::downloader::ItemDownloader;
use crate::error::{Error, Result};
use crate::extractor::{CliExtractor, Extractor};
use crate::post_processing::{self, MediaProcessor};
use crate::types::{DownloadItem, Event, PlaylistInfo, RunOptions, RunSummary};
use crate::utils::sanitize_filename;
use batching::PendingBatch;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Capacity of the event channel; slow subscribers lose the oldest events first
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Archive name used when neither the caller nor the playlist provides one
const DEFAULT_ARCHIVE_NAME: &str = "download";

/// How one item ended, as seen by the drain loop
#[derive(Debug)]
enum Outcome {
    Completed(PathBuf),
    Failed,
    Skipped,
}

/// Downloads playlists and single videos
///
/// Owns the configuration, the extractor, the media processor and the event
/// channel; nothing is global. Subscribe before starting a run to receive
/// every event.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::{Config, PlaylistDownloader, RunOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let downloader = PlaylistDownloader::new(config.clone())?;
/// let mut events = downloader.subscribe();
///
/// tokio::spawn(async move {
///     while let Ok(event) = events.recv().await {
///         println!("{}", event.message());
///     }
/// });
///
/// let options = RunOptions::from_config(&config, "");
/// let summary = downloader
///     .download_playlist("https://www.youtube.com/playlist?list=PL123", options)
///     .await?;
/// println!("{} archives written", summary.archives.len());
/// # Ok(())
/// # }
/// ```
pub struct PlaylistDownloader {
    config: Arc<Config>,
    extractor: Arc<dyn Extractor>,
    items: ItemDownloader,
    archiver: Archiver,
    event_tx: broadcast::Sender<Event>,
    cancel_token: std::sync::Mutex<CancellationToken>,
}

impl PlaylistDownloader {
    /// Create a downloader backed by the external yt-dlp and ffmpeg binaries
    ///
    /// Fails when the configuration is invalid or yt-dlp cannot be found.
    /// A missing ffmpeg only disables thumbnail and chapter embedding.
    pub fn new(config: Config) -> Result<Self> {
        let extractor = CliExtractor::from_config(&config.tools).ok_or_else(|| {
            Error::NotSupported(
                "downloading requires the yt-dlp binary. \
                 Configure ytdlp_path in config or ensure yt-dlp is in PATH."
                    .into(),
            )
        })?;
        let processor = post_processing::detect(&config.tools);
        Self::with_components(config, Arc::new(extractor), processor)
    }

    /// Create a downloader with explicit collaborators
    pub fn with_components(
        config: Config,
        extractor: Arc<dyn Extractor>,
        processor: Arc<dyn MediaProcessor>,
    ) -> Result<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let items = ItemDownloader::new(
            config.clone(),
            extractor.clone(),
            processor,
            event_tx.clone(),
        );

        debug!(extractor = extractor.name(), "playlist downloader ready");

        Ok(Self {
            config,
            extractor,
            items,
            archiver: Archiver::new(),
            event_tx,
            cancel_token: std::sync::Mutex::new(CancellationToken::new()),
        })
    }

    /// Subscribe to run events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration in use
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token observed by the next (or current) run
    ///
    /// Cancelling it directly has the same effect as [`Self::cancel`] on the
    /// run that observes it. A cancelled token is retired when that run
    /// finishes, so later runs are unaffected. A token cancelled while no run
    /// is active applies to the next run only.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.current_token()
    }

    /// Cancel the current run
    ///
    /// Items not yet started are skipped; items in flight run to completion.
    /// The final archive flush, the sweep and `all_finished` still happen.
    /// Later runs are unaffected.
    pub fn cancel(&self) {
        let mut token = self
            .cancel_token
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        token.cancel();
        *token = CancellationToken::new();
        info!("run cancelled");
    }

    /// Replace the shared token if it was cancelled directly
    fn retire_cancelled_token(&self) {
        let mut token = self
            .cancel_token
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if token.is_cancelled() {
            debug!("installing fresh cancellation token");
            *token = CancellationToken::new();
        }
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel_token
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Expand a playlist URL into items with stable positional indices
    pub async fn resolve_playlist(&self, url: &str, use_auth_cookies: bool) -> Result<PlaylistInfo> {
        let cookies = &self.config.download.cookie_file;
        let cookie_file = (use_auth_cookies && cookies.is_file()).then_some(cookies.as_path());

        let playlist = self.extractor.resolve_playlist(url, cookie_file).await?;
        info!(
            url,
            title = %playlist.title,
            entries = playlist.items.len(),
            "playlist resolved"
        );
        Ok(playlist)
    }

    /// Resolve a playlist and download every entry
    ///
    /// The sanitized playlist title becomes the archive name. If the playlist
    /// cannot be resolved, an `error` event and the terminal `all_finished`
    /// event are emitted and the resolution error is returned.
    pub async fn download_playlist(&self, url: &str, mut options: RunOptions) -> Result<RunSummary> {
        let playlist = match self.resolve_playlist(url, options.use_auth_cookies).await {
            Ok(playlist) => playlist,
            Err(e) => {
                error!(url, error = %e, "failed to resolve playlist");
                self.event_tx
                    .send(Event::error(None, format!("failed to resolve playlist: {}", e)))
                    .ok();
                self.event_tx
                    .send(Event::AllFinished {
                        message: "nothing downloaded".into(),
                    })
                    .ok();
                return Err(e);
            }
        };

        let title = sanitize_filename(playlist.title.trim());
        if !title.is_empty() {
            options.archive_name = title;
        }
        self.event_tx
            .send(Event::info(
                None,
                format!(
                    "playlist {} has {} entries",
                    playlist.title,
                    playlist.items.len()
                ),
            ))
            .ok();

        self.run(playlist.items, &options).await
    }

    /// Download one video as a run of a single item with index 1
    pub async fn download_single(&self, url: &str, options: RunOptions) -> Result<RunSummary> {
        self.run(vec![DownloadItem::new(url, "", 1)], &options).await
    }

    /// Download `items`, archive completed files in batches and sweep the output directory
    ///
    /// `Err` is reserved for configuration problems detected before any item
    /// is dispatched: a zero worker count, duplicate sequence indices or an
    /// output directory that cannot be created. Item failures only show up in
    /// events and in the returned summary.
    pub async fn run(&self, items: Vec<DownloadItem>, options: &RunOptions) -> Result<RunSummary> {
        self.check_run(&items, options)?;
        tokio::fs::create_dir_all(&options.output_dir)
            .await
            .map_err(|e| {
                Error::config(
                    "output_dir",
                    format!(
                        "cannot create output directory {}: {}",
                        options.output_dir.display(),
                        e
                    ),
                )
            })?;

        let token = self.current_token();
        let total = items.len();
        let archive_name = match sanitize_filename(options.archive_name.trim()) {
            name if name.is_empty() => DEFAULT_ARCHIVE_NAME.to_string(),
            name => name,
        };
        let mut batch = PendingBatch::new(archive_name, self.config.archive.batch_size);
        let mut summary = RunSummary::default();

        info!(
            items = total,
            workers = options.worker_count,
            archive = options.archive_enabled,
            "starting run"
        );

        if options.worker_count == 1 {
            for item in items {
                let index = item.index;
                let outcome = if token.is_cancelled() {
                    Outcome::Skipped
                } else {
                    match self.items.download_item(&item, options).await {
                        Some(path) => Outcome::Completed(path),
                        None => Outcome::Failed,
                    }
                };
                self.on_completion(index, outcome, total, options, &mut batch, &mut summary)
                    .await;
            }
        } else {
            let mut completions = stream::iter(items)
                .map(|item| {
                    let downloader = self.items.clone();
                    let options = options.clone();
                    let token = token.clone();
                    let index = item.index;
                    let handle = tokio::spawn(async move {
                        if token.is_cancelled() {
                            return Outcome::Skipped;
                        }
                        match downloader.download_item(&item, &options).await {
                            Some(path) => Outcome::Completed(path),
                            None => Outcome::Failed,
                        }
                    });
                    async move { (index, handle.await) }
                })
                .buffer_unordered(options.worker_count);

            while let Some((index, joined)) = completions.next().await {
                let outcome = joined.unwrap_or_else(|e| {
                    error!(index, error = %e, "item task panicked");
                    self.event_tx
                        .send(Event::error(Some(index), format!("item {} aborted: {}", index, e)))
                        .ok();
                    Outcome::Failed
                });
                self.on_completion(index, outcome, total, options, &mut batch, &mut summary)
                    .await;
            }
        }

        if options.archive_enabled {
            self.flush(&mut batch, options, &mut summary).await;
        }

        if self.config.cleanup.enabled {
            post_processing::sweep(&options.output_dir, &self.config.cleanup).await;
        }
        self.retire_cancelled_token();

        let message = format!(
            "finished: {} succeeded, {} failed, {} skipped, {} archives",
            summary.succeeded,
            summary.failed,
            summary.skipped,
            summary.archives.len()
        );
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            archives = summary.archives.len(),
            "run complete"
        );
        self.event_tx.send(Event::AllFinished { message }).ok();

        Ok(summary)
    }

    fn check_run(&self, items: &[DownloadItem], options: &RunOptions) -> Result<()> {
        if options.worker_count == 0 {
            return Err(Error::config(
                "worker_count",
                "worker_count must be at least 1",
            ));
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.index) {
                return Err(Error::config(
                    "items",
                    format!("duplicate sequence index {}", item.index),
                ));
            }
        }
        Ok(())
    }

    async fn on_completion(
        &self,
        index: u32,
        outcome: Outcome,
        total: usize,
        options: &RunOptions,
        batch: &mut PendingBatch,
        summary: &mut RunSummary,
    ) {
        let done = summary.succeeded + summary.failed + summary.skipped + 1;

        match outcome {
            Outcome::Completed(path) => {
                summary.succeeded += 1;
                self.event_tx
                    .send(Event::info(
                        Some(index),
                        format!("item {} complete ({}/{})", index, done, total),
                    ))
                    .ok();

                if options.archive_enabled {
                    let full = batch.push(path);
                    debug!(index, pending = batch.len(), "queued for archiving");
                    if full {
                        self.flush(batch, options, summary).await;
                    }
                } else {
                    summary.files.push(path);
                }
            }
            Outcome::Failed => {
                summary.failed += 1;
                self.event_tx
                    .send(Event::info(
                        Some(index),
                        format!("item {} failed ({}/{})", index, done, total),
                    ))
                    .ok();
            }
            Outcome::Skipped => {
                summary.skipped += 1;
                debug!(index, "skipping item, run cancelled");
                self.event_tx
                    .send(Event::warning(
                        Some(index),
                        format!("item {} skipped: run cancelled", index),
                    ))
                    .ok();
            }
        }
    }

    async fn flush(&self, batch: &mut PendingBatch, options: &RunOptions, summary: &mut RunSummary) {
        let Some((name, files)) = batch.take() else {
            return;
        };
        let count = files.len();

        match self
            .archiver
            .archive(files.clone(), &name, &options.output_dir)
            .await
        {
            Ok(report) => {
                for missing in &report.missing {
                    self.event_tx
                        .send(Event::warning(
                            None,
                            format!("{} vanished before archiving", missing.display()),
                        ))
                        .ok();
                }
                if let Some(archive) = report.archive {
                    self.event_tx
                        .send(Event::info(
                            None,
                            format!("created {} with {} files", name, report.archived.len()),
                        ))
                        .ok();
                    summary.archives.push(archive);
                }
            }
            Err(e) => {
                warn!(archive = %name, files = count, error = %e, "archiving failed, files left in place");
                self.event_tx
                    .send(Event::warning(
                        None,
                        format!("failed to create {}: {}", name, e),
                    ))
                    .ok();
                summary.files.extend(files);
            }
        }
    }
}
