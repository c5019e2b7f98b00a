//! Core types for playlist-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One unit of work: a single video URL with its position in the run
///
/// `index` is 1-based and unique per run. It fixes the output filename prefix
/// (`{index:03}-`), so it never changes once the item is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadItem {
    /// Video URL handed to the extractor
    pub url: String,
    /// Title reported by playlist resolution (may be empty)
    #[serde(default)]
    pub title: String,
    /// 1-based sequence index
    pub index: u32,
}

impl DownloadItem {
    /// Create a new item
    pub fn new(url: impl Into<String>, title: impl Into<String>, index: u32) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            index,
        }
    }
}

/// Requested output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DownloadFormat {
    /// Best available mp4 video with m4a audio
    #[default]
    #[serde(rename = "best_video", alias = "Best Video")]
    BestVideo,
    /// mp4 capped at 1080 lines
    #[serde(rename = "1080p")]
    Video1080p,
    /// mp4 capped at 720 lines
    #[serde(rename = "720p")]
    Video720p,
    /// Audio only, converted to mp3
    #[serde(rename = "audio_only", alias = "Audio (MP3)")]
    AudioOnly,
}

impl DownloadFormat {
    /// yt-dlp format selector for this format
    pub fn selector(&self) -> &'static str {
        match self {
            DownloadFormat::BestVideo => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            DownloadFormat::Video1080p => {
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best[height<=1080]"
            }
            DownloadFormat::Video720p => {
                "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best[height<=720]"
            }
            DownloadFormat::AudioOnly => "bestaudio/best",
        }
    }

    /// Extension of the final artifact
    pub fn extension(&self) -> &'static str {
        match self {
            DownloadFormat::AudioOnly => "mp3",
            _ => "mp4",
        }
    }

    /// Whether the output is an mp4 container that can take a cover image and chapters
    pub fn supports_muxing(&self) -> bool {
        !matches!(self, DownloadFormat::AudioOnly)
    }

    /// Whether a thumbnail should be retrieved next to the output
    pub fn wants_thumbnail(&self) -> bool {
        self.supports_muxing()
    }
}

impl std::fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DownloadFormat::BestVideo => "Best Video",
            DownloadFormat::Video1080p => "1080p",
            DownloadFormat::Video720p => "720p",
            DownloadFormat::AudioOnly => "Audio (MP3)",
        };
        f.write_str(label)
    }
}

impl std::str::FromStr for DownloadFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best video" | "best_video" | "best" => Ok(DownloadFormat::BestVideo),
            "1080p" => Ok(DownloadFormat::Video1080p),
            "720p" => Ok(DownloadFormat::Video720p),
            "audio (mp3)" | "audio_only" | "audio" | "mp3" => Ok(DownloadFormat::AudioOnly),
            other => Err(format!("unknown download format: {other}")),
        }
    }
}

/// Event emitted during a download run
///
/// Events are append-only. Per item they arrive in order; across concurrent
/// workers they interleave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Event {
    /// Byte-level progress for one item
    Downloading {
        /// Sequence index of the item
        index: u32,
        /// Bytes retrieved so far
        bytes_done: u64,
        /// Total size if known
        #[serde(skip_serializing_if = "Option::is_none")]
        bytes_total: Option<u64>,
        /// Whether `bytes_total` is the extractor's estimate
        estimated: bool,
        /// Human-readable progress line
        message: String,
    },

    /// Retrieval finished for one item (post-processing follows)
    Finished {
        /// Sequence index of the item
        index: u32,
        /// Human-readable message
        message: String,
    },

    /// A post-processing step started for one item
    #[serde(rename = "postprocessing")]
    PostProcessing {
        /// Sequence index of the item
        index: u32,
        /// Human-readable message
        message: String,
    },

    /// Informational message (item completion, batch archived, ...)
    Info {
        /// Item the message refers to, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
        /// Human-readable message
        message: String,
    },

    /// Soft failure; the run continues
    Warning {
        /// Item the message refers to, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
        /// Human-readable message
        message: String,
    },

    /// Item failure; the item yields no file
    Error {
        /// Item the message refers to, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
        /// Human-readable message
        message: String,
    },

    /// One item is complete, including post-processing
    FinishedVideo {
        /// Sequence index of the item
        index: u32,
        /// Final media path
        path: PathBuf,
        /// Human-readable message
        message: String,
    },

    /// Terminal event, emitted exactly once per run
    AllFinished {
        /// Human-readable summary
        message: String,
    },
}

impl Event {
    /// Human-readable message carried by every variant
    pub fn message(&self) -> &str {
        match self {
            Event::Downloading { message, .. }
            | Event::Finished { message, .. }
            | Event::PostProcessing { message, .. }
            | Event::Info { message, .. }
            | Event::Warning { message, .. }
            | Event::Error { message, .. }
            | Event::FinishedVideo { message, .. }
            | Event::AllFinished { message } => message,
        }
    }

    /// Sequence index of the item this event refers to, if any
    pub fn index(&self) -> Option<u32> {
        match self {
            Event::Downloading { index, .. }
            | Event::Finished { index, .. }
            | Event::PostProcessing { index, .. }
            | Event::FinishedVideo { index, .. } => Some(*index),
            Event::Info { index, .. } | Event::Warning { index, .. } | Event::Error { index, .. } => {
                *index
            }
            Event::AllFinished { .. } => None,
        }
    }

    pub(crate) fn info(index: Option<u32>, message: impl Into<String>) -> Self {
        Event::Info {
            index,
            message: message.into(),
        }
    }

    pub(crate) fn warning(index: Option<u32>, message: impl Into<String>) -> Self {
        Event::Warning {
            index,
            message: message.into(),
        }
    }

    pub(crate) fn error(index: Option<u32>, message: impl Into<String>) -> Self {
        Event::Error {
            index,
            message: message.into(),
        }
    }
}

/// Chapter marker reported by the extractor (times in seconds)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter title
    #[serde(default)]
    pub title: String,
    /// Start offset in seconds
    pub start_time: f64,
    /// End offset in seconds
    pub end_time: f64,
}

/// Metadata the downloader needs from the extractor after a retrieval
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Video title
    #[serde(default)]
    pub title: String,
    /// Chapter markers (empty when the video has none)
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Final path after merging/conversion, when the extractor reported one
    #[serde(default)]
    pub final_path: Option<PathBuf>,
}

/// A resolved playlist
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    /// Playlist title
    pub title: String,
    /// Entries with their positional indices
    pub items: Vec<DownloadItem>,
}

/// Per-run options for the orchestrator
#[derive(Clone, Debug, PartialEq)]
pub struct RunOptions {
    /// Directory receiving media, sidecars and archives
    pub output_dir: PathBuf,
    /// Pass the cookie file to the extractor
    pub use_auth_cookies: bool,
    /// Parallel workers (1 = strictly sequential)
    pub worker_count: usize,
    /// Bundle completed files into numbered zip archives
    pub archive_enabled: bool,
    /// Requested output format
    pub format: DownloadFormat,
    /// Archive name stem; parts are `{archive_name}_part_{n}.zip`
    pub archive_name: String,
}

impl RunOptions {
    /// Build options from the configured defaults
    pub fn from_config(config: &crate::config::Config, archive_name: impl Into<String>) -> Self {
        Self {
            output_dir: config.download.output_dir.clone(),
            use_auth_cookies: config.download.use_auth_cookies,
            worker_count: config.download.worker_count,
            archive_enabled: config.archive.enabled,
            format: config.download.format,
            archive_name: archive_name.into(),
        }
    }
}

/// Outcome of a run, for callers that do not watch events
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Items that produced a file
    pub succeeded: usize,
    /// Items that failed
    pub failed: usize,
    /// Items never started because the run was cancelled
    pub skipped: usize,
    /// Archives written, in creation order
    pub archives: Vec<PathBuf>,
    /// Completed files left standing (archiving disabled or files not archived)
    pub files: Vec<PathBuf>,
}
