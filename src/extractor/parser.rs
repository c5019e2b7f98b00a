//! Parser for yt-dlp output
//!
//! The CLI extractor asks yt-dlp for machine-readable lines (see the markers
//! below) and reads the playlist JSON produced by `--flat-playlist -J`.

use super::traits::ExtractorProgress;
use crate::error::DownloadError;
use crate::retry::is_signature_message;
use crate::types::{Chapter, DownloadItem, PlaylistInfo, VideoInfo};
use serde::Deserialize;
use std::path::PathBuf;

/// Prefix of progress lines produced by the download progress template
pub const PROGRESS_MARKER: &str = "PLDL_PROGRESS|";
/// Prefix of lines produced by the post-processing progress template
pub const POSTPROCESS_MARKER: &str = "PLDL_POST|";
/// Prefix of the info JSON printed after the final file is moved into place
pub const INFO_MARKER: &str = "PLDL_INFO|";

/// `--progress-template` for download progress
pub const PROGRESS_TEMPLATE: &str = "download:PLDL_PROGRESS|%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s";
/// `--progress-template` for post-processing progress
pub const POSTPROCESS_TEMPLATE: &str =
    "postprocess:PLDL_POST|%(progress.status)s|%(progress.postprocessor)s";
/// `--print` template emitting the info fields the downloader needs
pub const INFO_TEMPLATE: &str = "after_move:PLDL_INFO|%(.{title,chapters,filepath})j";

/// Base URL used when a flat playlist entry only carries a video id
const WATCH_URL_BASE: &str = "https://www.youtube.com/watch?v=";

/// One classified line of extractor stdout
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// Progress update
    Progress(ExtractorProgress),
    /// Final metadata for the item
    Info(VideoInfo),
    /// Anything else (logged at trace level by the caller)
    Other,
}

/// Classify one line of extractor stdout
pub fn parse_output_line(line: &str) -> OutputLine {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        return parse_progress_fields(rest)
            .map(OutputLine::Progress)
            .unwrap_or(OutputLine::Other);
    }

    if let Some(rest) = line.strip_prefix(POSTPROCESS_MARKER) {
        let mut fields = rest.split('|');
        let status = fields.next().unwrap_or_default();
        let name = fields.next().unwrap_or_default();
        if status == "started" {
            return OutputLine::Progress(ExtractorProgress::PostProcessing {
                name: name.to_string(),
            });
        }
        return OutputLine::Other;
    }

    if let Some(rest) = line.strip_prefix(INFO_MARKER) {
        return match parse_video_info(rest) {
            Ok(info) => OutputLine::Info(info),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable info line from extractor");
                OutputLine::Other
            }
        };
    }

    OutputLine::Other
}

fn parse_progress_fields(rest: &str) -> Option<ExtractorProgress> {
    let fields: Vec<&str> = rest.split('|').collect();
    let status = *fields.first()?;

    match status {
        "finished" => Some(ExtractorProgress::Finished),
        "downloading" => {
            let bytes_done = fields.get(1).and_then(|v| parse_byte_count(v)).unwrap_or(0);
            let exact = fields.get(2).and_then(|v| parse_byte_count(v));
            let estimate = fields.get(3).and_then(|v| parse_byte_count(v));
            let (bytes_total, estimated) = match (exact, estimate) {
                (Some(total), _) => (Some(total), false),
                (None, Some(total)) => (Some(total), true),
                (None, None) => (None, false),
            };
            Some(ExtractorProgress::Downloading {
                bytes_done,
                bytes_total,
                estimated,
            })
        }
        _ => None,
    }
}

/// Parse a byte count field; yt-dlp prints `NA` for missing values and floats for estimates
fn parse_byte_count(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() || value == "NA" || value == "None" {
        return None;
    }
    value
        .parse::<u64>()
        .ok()
        .or_else(|| value.parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64))
}

#[derive(Deserialize)]
struct RawInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    chapters: Option<Vec<RawChapter>>,
    #[serde(default)]
    filepath: Option<PathBuf>,
    #[serde(default)]
    requested_downloads: Option<Vec<RawRequestedDownload>>,
}

#[derive(Deserialize)]
struct RawChapter {
    #[serde(default)]
    title: Option<String>,
    start_time: f64,
    end_time: f64,
}

#[derive(Deserialize)]
struct RawRequestedDownload {
    #[serde(default)]
    filepath: Option<PathBuf>,
}

/// Translate the extractor's info JSON into [`VideoInfo`]
pub fn parse_video_info(json: &str) -> crate::Result<VideoInfo> {
    let raw: RawInfo = serde_json::from_str(json)?;

    let chapters = raw
        .chapters
        .unwrap_or_default()
        .into_iter()
        .map(|c| Chapter {
            title: c.title.unwrap_or_default(),
            start_time: c.start_time,
            end_time: c.end_time,
        })
        .collect();

    let final_path = raw.filepath.or_else(|| {
        raw.requested_downloads
            .and_then(|downloads| downloads.into_iter().find_map(|d| d.filepath))
    });

    Ok(VideoInfo {
        title: raw.title.unwrap_or_default(),
        chapters,
        final_path,
    })
}

#[derive(Deserialize)]
struct RawPlaylist {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    entries: Option<Vec<Option<RawEntry>>>,
    #[serde(default)]
    webpage_url: Option<String>,
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

impl RawEntry {
    fn resolve_url(&self) -> Option<String> {
        [self.url.as_deref(), self.webpage_url.as_deref()]
            .into_iter()
            .flatten()
            .find(|candidate| url::Url::parse(candidate).is_ok())
            .map(str::to_string)
            .or_else(|| {
                self.id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .map(|id| format!("{WATCH_URL_BASE}{id}"))
            })
    }
}

/// Parse the JSON produced by `--flat-playlist -J`
///
/// Null entries and entries without a usable URL are skipped, but every
/// position consumes an index so the remaining items keep their place. A URL
/// that is a single video (no `entries`) resolves to one item with index 1.
pub fn parse_playlist(json: &[u8], url: &str) -> crate::Result<PlaylistInfo> {
    let raw: RawPlaylist =
        serde_json::from_slice(json).map_err(|e| DownloadError::PlaylistUnavailable {
            url: url.to_string(),
            reason: format!("invalid playlist JSON: {e}"),
        })?;

    let title = raw.title.unwrap_or_default();

    let Some(entries) = raw.entries else {
        let video_url = raw.webpage_url.unwrap_or_else(|| url.to_string());
        return Ok(PlaylistInfo {
            items: vec![DownloadItem::new(video_url, title.clone(), 1)],
            title,
        });
    };

    let mut items = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        let index = position as u32 + 1;
        let Some(entry) = entry else {
            tracing::debug!(index, "skipping unavailable playlist entry");
            continue;
        };
        match entry.resolve_url() {
            Some(entry_url) => {
                items.push(DownloadItem::new(
                    entry_url,
                    entry.title.unwrap_or_default(),
                    index,
                ));
            }
            None => {
                tracing::warn!(index, "playlist entry has no usable URL, skipping");
            }
        }
    }

    Ok(PlaylistInfo { title, items })
}

/// Pick the most useful message from the extractor's stderr tail
///
/// The last `ERROR:` line wins; otherwise the whole tail is returned.
pub fn error_message(stderr_tail: &[String]) -> String {
    stderr_tail
        .iter()
        .rev()
        .find(|line| line.trim_start().starts_with("ERROR:"))
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| stderr_tail.join("\n").trim().to_string())
}

/// Classify an extractor failure
///
/// Signature problems are often reported as a `WARNING:` line ahead of an
/// unrelated final `ERROR:`, so every line of the stderr tail is checked.
pub fn classify_failure(url: &str, message: String, stderr_tail: &[String]) -> DownloadError {
    if is_signature_message(&message) || stderr_tail.iter().any(|line| is_signature_message(line)) {
        DownloadError::SignatureExtraction {
            url: url.to_string(),
            message,
        }
    } else {
        DownloadError::Extraction {
            url: url.to_string(),
            message,
        }
    }
}
