//! Configuration types for playlist-dl

use crate::error::{Error, Result};
use crate::types::DownloadFormat;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Download behavior configuration (directories, concurrency, format)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Output directory (default: "./downloads")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Parallel workers for playlist downloads (default: 5, 1 = sequential)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Requested output format
    #[serde(default)]
    pub format: DownloadFormat,

    /// Pass the cookie file to the extractor (default: false)
    #[serde(default)]
    pub use_auth_cookies: bool,

    /// Netscape-format cookie file used when `use_auth_cookies` is set (default: "cookies.txt")
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            worker_count: default_worker_count(),
            format: DownloadFormat::default(),
            use_auth_cookies: false,
            cookie_file: default_cookie_file(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg, ffprobe)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Path to ffprobe executable (auto-detected if None)
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Command used to upgrade the extractor (default: `yt-dlp -U`)
    ///
    /// The first element is the program, the rest are its arguments, e.g.
    /// `["python3", "-m", "pip", "install", "--upgrade", "yt-dlp"]`.
    #[serde(default)]
    pub upgrade_command: Option<Vec<String>>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            ffprobe_path: None,
            search_path: true,
            upgrade_command: None,
        }
    }
}

impl ToolsConfig {
    /// Resolve a tool binary: explicit path first, then PATH lookup when allowed
    pub fn resolve(&self, explicit: Option<&PathBuf>, name: &str) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.clone());
        }
        if self.search_path {
            which::which(name).ok()
        } else {
            None
        }
    }
}

/// Retry policy for transient signature/nsig extraction failures
///
/// Only signature-class errors are retried. Every other extractor error fails
/// the item on the first attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRetryPolicy {
    /// Total attempts including the first one (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts (default: 5 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub delay: Duration,

    /// Upgrade the extractor before retrying (default: true)
    #[serde(default = "default_true")]
    pub upgrade_on_signature_error: bool,

    /// Add random jitter to the delay so parallel workers do not retry in lockstep (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for SignatureRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay: default_retry_delay(),
            upgrade_on_signature_error: true,
            jitter: false,
        }
    }
}

/// Archive batching configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Bundle completed files into zip archives (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Files per archive part (default: 10)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: default_batch_size(),
        }
    }
}

/// Cleanup configuration for transient artifacts left in the output directory
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Sweep the output directory at the end of a run (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filename suffixes treated as transient (compared case-insensitively)
    #[serde(default = "default_transient_suffixes")]
    pub transient_suffixes: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            transient_suffixes: default_transient_suffixes(),
        }
    }
}

/// Subtitle retrieval and reconciliation preferences
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubtitleConfig {
    /// Languages requested from the extractor, in preference order
    #[serde(default = "default_subtitle_languages")]
    pub languages: Vec<String>,

    /// Encoding kept when both are present (default: "vtt")
    #[serde(default = "default_preferred_subtitle")]
    pub preferred: String,

    /// Encoding dropped when the preferred one exists (default: "srt")
    #[serde(default = "default_fallback_subtitle")]
    pub fallback: String,
}

impl Default for SubtitleConfig {
    fn default() -> Self {
        Self {
            languages: default_subtitle_languages(),
            preferred: default_preferred_subtitle(),
            fallback: default_fallback_subtitle(),
        }
    }
}

impl SubtitleConfig {
    /// `--sub-format` value handed to the extractor, e.g. `vtt/srt`
    pub fn format_preference(&self) -> String {
        format!("{}/{}", self.preferred, self.fallback)
    }
}

/// Main configuration for playlist-dl
///
/// Fields are grouped into sub-configs:
/// - [`download`](DownloadConfig): output directory, workers, format, cookies
/// - [`tools`](ToolsConfig): external binary paths
/// - [`retry`](SignatureRetryPolicy): signature error retry policy
/// - [`archive`](ArchiveConfig): zip batching
/// - [`cleanup`](CleanupConfig): transient artifact sweep
/// - [`subtitles`](SubtitleConfig): subtitle languages and preference
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Download behavior
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Signature error retry policy
    #[serde(default)]
    pub retry: SignatureRetryPolicy,

    /// Archive batching
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// End-of-run cleanup
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// Subtitle handling
    #[serde(default)]
    pub subtitles: SubtitleConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// A missing file yields the defaults. A corrupt file is logged and also
    /// yields the defaults, so a damaged settings file never blocks a download.
    pub fn load(path: &Path) -> Config {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(?path, "config file not found, using defaults");
                return Config::default();
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "failed to read config file, using defaults");
                return Config::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(?path, error = %e, "corrupt config file, using defaults");
                Config::default()
            }
        }
    }

    /// Write configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check the invariants the orchestrator relies on
    pub fn validate(&self) -> Result<()> {
        if self.download.worker_count == 0 {
            return Err(Error::config(
                "download.worker_count",
                "worker_count must be at least 1",
            ));
        }
        if self.archive.batch_size == 0 {
            return Err(Error::config(
                "archive.batch_size",
                "batch_size must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config(
                "retry.max_attempts",
                "max_attempts must be at least 1",
            ));
        }
        Ok(())
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_worker_count() -> usize {
    5
}

fn default_cookie_file() -> PathBuf {
    PathBuf::from("cookies.txt")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_batch_size() -> usize {
    10
}

fn default_transient_suffixes() -> Vec<String> {
    vec![
        ".temp.mp4".into(),
        ".part".into(),
        ".ytdl".into(),
        ".webp".into(),
        ".jpg".into(),
        ".jpeg".into(),
        ".png".into(),
        ".ffmeta".into(),
    ]
}

fn default_subtitle_languages() -> Vec<String> {
    vec!["zh.TW".into(), "zh.CN".into(), "en".into(), "ja".into()]
}

fn default_preferred_subtitle() -> String {
    "vtt".into()
}

fn default_fallback_subtitle() -> String {
    "srt".into()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
