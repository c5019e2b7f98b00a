//! Utility functions for filenames and path manipulation

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Characters that are illegal in filenames on at least one supported platform
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Remove characters that are illegal in filenames
///
/// Only the characters `\ / * ? : " < > |` are removed; everything else,
/// including whitespace and non-ASCII text, is preserved. The function is
/// total and idempotent.
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("a/b:c*d"), "abcd");
/// assert_eq!(sanitize_filename("Live: 東京 <2024>"), "Live 東京 2024");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

/// Filename stem for an item: `{index:03}-{sanitized title}`
///
/// ```
/// use playlist_dl::utils::media_base_name;
///
/// assert_eq!(media_base_name(7, "What? Now"), "007-What Now");
/// ```
pub fn media_base_name(index: u32, title: &str) -> String {
    format!("{index:03}-{}", sanitize_filename(title))
}

/// Expected media path for an item: `{dir}/{index:03}-{sanitized title}.{ext}`
///
/// The name is built by appending, so titles containing dots survive intact.
pub fn media_path(dir: &Path, index: u32, title: &str, ext: &str) -> PathBuf {
    dir.join(format!("{}.{ext}", media_base_name(index, title)))
}

/// Append `suffix` to the full filename of `path` (`clip.mp4` + `.temp.mp4` -> `clip.mp4.temp.mp4`)
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Case-insensitive suffix check on a file name
pub fn has_suffix_ignore_case(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name
            .get(name.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}

/// Lowercased extension of `path`, if any
pub fn extension_lowercase(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
