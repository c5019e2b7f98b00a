//! FFMETADATA1 rendering for chapter markers

use crate::types::Chapter;
use std::fmt::Write;

/// Render chapters as an ffmpeg metadata file with a millisecond timebase
///
/// ```
/// use playlist_dl::post_processing::render_ffmetadata;
/// use playlist_dl::types::Chapter;
///
/// let text = render_ffmetadata(&[Chapter {
///     title: "Intro".into(),
///     start_time: 0.0,
///     end_time: 1.5,
/// }]);
/// assert!(text.starts_with(";FFMETADATA1\n"));
/// assert!(text.contains("START=0\nEND=1500\ntitle=Intro\n"));
/// ```
pub fn render_ffmetadata(chapters: &[Chapter]) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    for chapter in chapters {
        let start = to_millis(chapter.start_time);
        // ffmpeg rejects chapters that end before they start
        let end = to_millis(chapter.end_time).max(start);
        let _ = write!(
            out,
            "\n[CHAPTER]\nTIMEBASE=1/1000\nSTART={start}\nEND={end}\ntitle={}\n",
            escape_value(&chapter.title)
        );
    }
    out
}

fn to_millis(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

/// Escape `=`, `;`, `#`, `\` and newlines with a backslash
fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
