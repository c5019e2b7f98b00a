//! Subtitle sidecar reconciliation

use crate::config::SubtitleConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Sidecar path for `media` in `lang` with extension `ext` (`001-a.mp4` -> `001-a.en.vtt`)
pub(crate) fn sidecar_path(media: &Path, lang: &str, ext: &str) -> PathBuf {
    media.with_extension(format!("{lang}.{ext}"))
}

/// Keep one encoding per language
///
/// When both the preferred and the fallback encoding exist for a language,
/// the fallback is deleted. Returns the files removed.
pub(crate) async fn reconcile_subtitles(media: &Path, config: &SubtitleConfig) -> Vec<PathBuf> {
    let mut removed = Vec::new();

    for lang in &config.languages {
        let preferred = sidecar_path(media, lang, &config.preferred);
        let fallback = sidecar_path(media, lang, &config.fallback);

        let has_preferred = tokio::fs::try_exists(&preferred).await.unwrap_or(false);
        let has_fallback = tokio::fs::try_exists(&fallback).await.unwrap_or(false);

        match (has_preferred, has_fallback) {
            (true, true) => match tokio::fs::remove_file(&fallback).await {
                Ok(()) => {
                    debug!(?fallback, "removed duplicate subtitle");
                    removed.push(fallback);
                }
                Err(e) => warn!(?fallback, error = %e, "failed to remove duplicate subtitle"),
            },
            (false, false) => debug!(?media, lang = %lang, "no subtitle for language"),
            _ => debug!(?media, lang = %lang, "single subtitle encoding present"),
        }
    }

    removed
}

/// Thumbnail extensions the extractor may write next to the media
const THUMBNAIL_EXTENSIONS: &[&str] = &["webp", "jpg", "jpeg", "png"];

/// Raw thumbnail written next to `media`, if any
pub(crate) async fn find_thumbnail(media: &Path) -> Option<PathBuf> {
    for ext in THUMBNAIL_EXTENSIONS {
        let candidate = media.with_extension(ext);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}
