//! Extraction tool boundary
//!
//! Network retrieval is delegated to an external extraction tool. This module
//! defines the [`Extractor`] trait the downloader talks to and the yt-dlp
//! backed implementation.
//!
//! - [`CliExtractor`]: drives the external `yt-dlp` binary
//!
//! The extractor's loosely typed output is translated at this boundary into
//! [`VideoInfo`](crate::types::VideoInfo) and
//! [`PlaylistInfo`](crate::types::PlaylistInfo); nothing past this module
//! looks at raw JSON.

mod cli;
pub mod parser;
mod traits;

pub use cli::CliExtractor;
pub use traits::{ExtractRequest, Extractor, ExtractorProgress, ProgressCallback};
