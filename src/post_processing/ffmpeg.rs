//! Media processor backed by the external ffmpeg and ffprobe binaries

use super::chapters::render_ffmetadata;
use super::scratch::ScratchGuard;
use super::traits::MediaProcessor;
use crate::config::ToolsConfig;
use crate::error::{Error, PostProcessError};
use crate::types::Chapter;
use crate::utils::{append_suffix, extension_lowercase};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, info};

/// Suffix of the scratch container written next to the media
pub(crate) const SCRATCH_SUFFIX: &str = ".temp.mp4";
/// Suffix of the chapter metadata side-channel file
pub(crate) const METADATA_SUFFIX: &str = ".ffmeta";

/// Thumbnail extensions ffmpeg can attach without transcoding
const ATTACHABLE_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Media processor that shells out to ffmpeg/ffprobe
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::post_processing::{FfmpegProcessor, MediaProcessor};
/// use playlist_dl::types::Chapter;
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let processor = FfmpegProcessor::new(
///     PathBuf::from("/usr/bin/ffmpeg"),
///     PathBuf::from("/usr/bin/ffprobe"),
/// );
/// let chapters = vec![Chapter { title: "Intro".into(), start_time: 0.0, end_time: 30.0 }];
/// processor.embed_chapters(Path::new("001-talk.mp4"), &chapters).await?;
/// # Ok(())
/// # }
/// ```
pub struct FfmpegProcessor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegProcessor {
    /// Create a processor with explicit binary paths
    pub fn new(ffmpeg: PathBuf, ffprobe: PathBuf) -> Self {
        Self { ffmpeg, ffprobe }
    }

    /// Attempt to find ffmpeg and ffprobe in PATH
    ///
    /// Returns `None` unless both binaries are found.
    pub fn from_path() -> Option<Self> {
        let ffmpeg = which::which("ffmpeg").ok()?;
        let ffprobe = which::which("ffprobe").ok()?;
        Some(Self::new(ffmpeg, ffprobe))
    }

    /// Build from tool configuration (explicit paths, then PATH lookup)
    pub fn from_config(tools: &ToolsConfig) -> Option<Self> {
        let ffmpeg = tools.resolve(tools.ffmpeg_path.as_ref(), "ffmpeg")?;
        let ffprobe = tools.resolve(tools.ffprobe_path.as_ref(), "ffprobe")?;
        Some(Self::new(ffmpeg, ffprobe))
    }

    async fn run(
        &self,
        tool: &str,
        program: &Path,
        args: &[&OsStr],
        media: &Path,
    ) -> crate::Result<Output> {
        debug!(tool, ?args, "running media tool");

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute {}: {}", tool, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default().trim();
            return Err(PostProcessError::ToolFailed {
                tool: tool.to_string(),
                path: media.to_path_buf(),
                reason: if detail.is_empty() {
                    format!("exit status {}", output.status)
                } else {
                    format!("exit status {}: {}", output.status, detail)
                },
            }
            .into());
        }

        Ok(output)
    }

    async fn ffmpeg(&self, args: &[&OsStr], media: &Path) -> crate::Result<()> {
        let mut full: Vec<&OsStr> = vec![
            OsStr::new("-y"),
            OsStr::new("-hide_banner"),
            OsStr::new("-loglevel"),
            OsStr::new("error"),
        ];
        full.extend_from_slice(args);
        self.run("ffmpeg", &self.ffmpeg, &full, media).await.map(|_| ())
    }

    /// Number of packets in stream `v:1` of `container`
    async fn attached_picture_packets(&self, container: &Path, media: &Path) -> crate::Result<u64> {
        let output = self
            .run(
                "ffprobe",
                &self.ffprobe,
                &[
                    OsStr::new("-v"),
                    OsStr::new("error"),
                    OsStr::new("-select_streams"),
                    OsStr::new("v:1"),
                    OsStr::new("-count_packets"),
                    OsStr::new("-show_entries"),
                    OsStr::new("stream=nb_read_packets"),
                    OsStr::new("-of"),
                    OsStr::new("csv=p=0"),
                    container.as_os_str(),
                ],
                media,
            )
            .await?;

        Ok(parse_packet_count(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// ffprobe prints one integer per selected stream; anything else counts as zero
fn parse_packet_count(stdout: &str) -> u64 {
    stdout
        .lines()
        .next()
        .and_then(|line| line.trim().trim_end_matches(',').parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn embed_thumbnail(&self, media: &Path, thumbnail: &Path) -> crate::Result<()> {
        let attachable = extension_lowercase(thumbnail)
            .is_some_and(|ext| ATTACHABLE_IMAGE_EXTENSIONS.contains(&ext.as_str()));
        let image = if attachable {
            thumbnail.to_path_buf()
        } else {
            append_suffix(thumbnail, ".jpg")
        };
        let scratch = append_suffix(media, SCRATCH_SUFFIX);

        let mut guard = ScratchGuard::new();
        guard.track(thumbnail);
        guard.track(&image);
        guard.track(&scratch);

        if !attachable {
            debug!(?thumbnail, ?image, "transcoding thumbnail");
            self.ffmpeg(&[OsStr::new("-i"), thumbnail.as_os_str(), image.as_os_str()], media)
                .await?;
        }

        self.ffmpeg(
            &[
                OsStr::new("-i"),
                media.as_os_str(),
                OsStr::new("-i"),
                image.as_os_str(),
                OsStr::new("-map"),
                OsStr::new("0"),
                OsStr::new("-map"),
                OsStr::new("1"),
                OsStr::new("-c"),
                OsStr::new("copy"),
                OsStr::new("-disposition:v:1"),
                OsStr::new("attached_pic"),
                OsStr::new("-metadata:s:v:1"),
                OsStr::new("title=Thumbnail"),
                scratch.as_os_str(),
            ],
            media,
        )
        .await?;

        if self.attached_picture_packets(&scratch, media).await? == 0 {
            return Err(PostProcessError::ThumbnailNotEmbedded {
                path: media.to_path_buf(),
            }
            .into());
        }

        tokio::fs::rename(&scratch, media).await?;
        info!(?media, "embedded thumbnail");
        Ok(())
    }

    async fn embed_chapters(&self, media: &Path, chapters: &[Chapter]) -> crate::Result<()> {
        if chapters.is_empty() {
            debug!(?media, "no chapters to embed");
            return Ok(());
        }

        let metadata = append_suffix(media, METADATA_SUFFIX);
        let scratch = append_suffix(media, SCRATCH_SUFFIX);

        let mut guard = ScratchGuard::new();
        guard.track(&metadata);
        guard.track(&scratch);

        tokio::fs::write(&metadata, render_ffmetadata(chapters)).await?;

        self.ffmpeg(
            &[
                OsStr::new("-i"),
                media.as_os_str(),
                OsStr::new("-i"),
                metadata.as_os_str(),
                OsStr::new("-map"),
                OsStr::new("0"),
                OsStr::new("-map_metadata"),
                OsStr::new("0"),
                OsStr::new("-map_chapters"),
                OsStr::new("1"),
                OsStr::new("-codec"),
                OsStr::new("copy"),
                scratch.as_os_str(),
            ],
            media,
        )
        .await?;

        tokio::fs::rename(&scratch, media).await?;
        info!(?media, chapters = chapters.len(), "embedded chapters");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
