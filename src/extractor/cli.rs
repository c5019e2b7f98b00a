//! CLI-based extractor using the external yt-dlp binary

use super::parser::{
    INFO_TEMPLATE, OutputLine, POSTPROCESS_TEMPLATE, PROGRESS_TEMPLATE, classify_failure,
    error_message, parse_output_line, parse_playlist,
};
use super::traits::{ExtractRequest, Extractor, ProgressCallback};
use crate::config::ToolsConfig;
use crate::error::{DownloadError, Error};
use crate::types::{DownloadFormat, PlaylistInfo, VideoInfo};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Mutex;

/// Number of stderr lines kept for error reporting
const STDERR_TAIL_LINES: usize = 30;

/// CLI-based extractor driving the external `yt-dlp` binary
///
/// Upgrades are serialized: when several workers hit a signature error at the
/// same time, they run the upgrade one after another instead of racing on the
/// same installation.
///
/// # Examples
///
/// ```no_run
/// use playlist_dl::extractor::{CliExtractor, Extractor};
/// use std::path::PathBuf;
///
/// // Create with explicit path
/// let extractor = CliExtractor::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let extractor = CliExtractor::from_path().expect("yt-dlp not found in PATH");
/// assert_eq!(extractor.name(), "cli-yt-dlp");
/// ```
pub struct CliExtractor {
    binary_path: PathBuf,
    upgrade_command: Option<Vec<String>>,
    upgrade_lock: Mutex<()>,
}

impl CliExtractor {
    /// Create a new CLI extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self {
            binary_path,
            upgrade_command: None,
            upgrade_lock: Mutex::new(()),
        }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build from tool configuration (explicit path, then PATH lookup)
    pub fn from_config(tools: &ToolsConfig) -> Option<Self> {
        tools
            .resolve(tools.ytdlp_path.as_ref(), "yt-dlp")
            .map(|path| Self::new(path).with_upgrade_command(tools.upgrade_command.clone()))
    }

    /// Replace the default `yt-dlp -U` upgrade with a custom command
    pub fn with_upgrade_command(mut self, command: Option<Vec<String>>) -> Self {
        self.upgrade_command = command.filter(|c| !c.is_empty());
        self
    }

    /// Path of the yt-dlp binary in use
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Command-line arguments for one retrieval
    pub(crate) fn build_args(request: &ExtractRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            request.format.selector().into(),
            "-o".into(),
            request.output_template.clone().into(),
            "--no-playlist".into(),
        ];

        if !request.subtitle_languages.is_empty() {
            args.push("--write-subs".into());
            args.push("--sub-langs".into());
            args.push(request.subtitle_languages.join(",").into());
            args.push("--sub-format".into());
            args.push(request.subtitle_format.clone().into());
        }

        if request.write_thumbnail {
            args.push("--write-thumbnail".into());
        }

        if let Some(cookies) = &request.cookie_file {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }

        match request.format {
            DownloadFormat::AudioOnly => {
                args.push("-x".into());
                args.push("--audio-format".into());
                args.push("mp3".into());
            }
            _ => {
                args.push("--merge-output-format".into());
                args.push("mp4".into());
            }
        }

        args.extend(
            [
                "--add-metadata",
                "--newline",
                "--progress",
                "--progress-template",
                PROGRESS_TEMPLATE,
                "--progress-template",
                POSTPROCESS_TEMPLATE,
                "--print",
                INFO_TEMPLATE,
            ]
            .into_iter()
            .map(OsString::from),
        );

        args.push(request.url.clone().into());
        args
    }

    fn upgrade_invocation(&self) -> (OsString, Vec<OsString>) {
        match &self.upgrade_command {
            Some(command) => {
                let mut parts = command.iter().map(OsString::from);
                let program = parts.next().unwrap_or_default();
                (program, parts.collect())
            }
            None => (self.binary_path.clone().into_os_string(), vec!["-U".into()]),
        }
    }
}

#[async_trait]
impl Extractor for CliExtractor {
    async fn extract(
        &self,
        request: &ExtractRequest,
        progress: ProgressCallback<'_>,
    ) -> crate::Result<VideoInfo> {
        let mut child = Command::new(&self.binary_path)
            .args(Self::build_args(request))
            .env("PYTHONIOENCODING", "UTF-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stdout unavailable".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::ExternalTool("yt-dlp stderr unavailable".into()))?;

        let stderr_task = tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Vec::from(tail)
        });

        let mut info = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            match parse_output_line(&line) {
                OutputLine::Progress(update) => progress(update),
                OutputLine::Info(parsed) => info = Some(parsed),
                OutputLine::Other => tracing::trace!(line = %line, "yt-dlp"),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to wait for yt-dlp: {}", e)))?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            let mut message = error_message(&stderr_tail);
            if message.is_empty() {
                message = format!("yt-dlp exited with {status}");
            }
            return Err(classify_failure(&request.url, message, &stderr_tail).into());
        }

        info.ok_or_else(|| {
            DownloadError::Extraction {
                url: request.url.clone(),
                message: "yt-dlp exited successfully but reported no output file".into(),
            }
            .into()
        })
    }

    async fn resolve_playlist(
        &self,
        url: &str,
        cookie_file: Option<&Path>,
    ) -> crate::Result<PlaylistInfo> {
        let mut command = Command::new(&self.binary_path);
        command.arg("--flat-playlist").arg("-J");
        if let Some(cookies) = cookie_file {
            command.arg("--cookies").arg(cookies);
        }

        let output = command
            .arg(url)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<String> = stderr.lines().map(str::to_string).collect();
            return Err(DownloadError::PlaylistUnavailable {
                url: url.to_string(),
                reason: error_message(&tail),
            }
            .into());
        }

        parse_playlist(&output.stdout, url)
    }

    async fn upgrade(&self) -> crate::Result<()> {
        let _guard = self.upgrade_lock.lock().await;
        let (program, args) = self.upgrade_invocation();

        tracing::info!(program = ?program, ?args, "upgrading extractor");

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                Error::ExternalTool(format!("Failed to execute {}: {}", program.to_string_lossy(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExternalTool(format!(
                "extractor upgrade exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!("extractor upgrade finished");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
