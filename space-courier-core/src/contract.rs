//! # contract: the seams of the pipeline
//!
//! Three traits split the pipeline into swappable collaborators:
//! - [`ImageSource`]: turns one remote API into an ordered list of [`ImageLink`]s.
//! - [`Downloader`]: writes the bytes behind a link to a path on disk.
//! - [`Publisher`]: hands files to a messaging chat.
//!
//! All three are async and annotated for `mockall`, so the run loop can be
//! exercised end to end with deterministic mocks (see the crate's `tests/`).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

#[allow(unused_imports)]
use mockall::{automock, predicate::*};

use crate::error::Result;

/// Identifies which upstream a link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    SpaceX,
    Apod,
    Epic,
}

impl SourceKind {
    /// Stem used for downloaded file names (`spacex0.jpg`, `nasa_apod3.gif`, ...).
    pub fn file_stem(&self) -> &'static str {
        match self {
            SourceKind::SpaceX => "spacex",
            SourceKind::Apod => "nasa_apod",
            SourceKind::Epic => "nasa_epic",
        }
    }

    /// Extension assumed when the URL path does not carry one.
    pub fn default_extension(&self) -> &'static str {
        match self {
            SourceKind::SpaceX | SourceKind::Apod => ".jpg",
            SourceKind::Epic => ".png",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// A downloadable image: its URL and the extension to store it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLink {
    pub url: String,
    /// Includes the leading dot, e.g. `.jpg`.
    pub extension: String,
}

impl ImageLink {
    /// Builds a link, inferring the extension from the URL path and falling
    /// back to `default_extension` when there is none.
    pub fn new(url: impl Into<String>, default_extension: &str) -> Self {
        let url = url.into();
        let extension =
            extension_from_url(&url).unwrap_or_else(|| default_extension.to_string());
        ImageLink { url, extension }
    }
}

/// Extension of the last path segment of `url`, percent-decoded, with its dot.
pub fn extension_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.last()?.to_string();
    let decoded = urlencoding::decode(&last)
        .map(|s| s.into_owned())
        .unwrap_or(last);
    let ext = Path::new(&decoded).extension()?.to_str()?;
    if ext.is_empty() {
        return None;
    }
    Some(format!(".{ext}"))
}

/// Projects one remote API into an ordered sequence of image links.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ImageSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// One round of requests against the upstream. Non-2xx answers fail immediately.
    async fn fetch_links(&self) -> Result<Vec<ImageLink>>;
}

/// Writes the body behind a URL to a local path.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Single GET, overwrite semantics. Implementations may post-process
    /// the written file (e.g. shrink oversized images) before returning.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

/// Sends files to a chat on a messaging platform.
///
/// Implemented by the Telegram client in the CLI crate and by mocks in tests.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn send_photo(&self, chat_id: &str, path: &Path) -> Result<()>;

    /// Used for files too large to go out as a compressed photo.
    async fn send_document(&self, chat_id: &str, path: &Path) -> Result<()>;

    /// One post bundling several images. Callers keep `paths` within the
    /// platform's per-group limit.
    async fn send_media_group(&self, chat_id: &str, paths: &[PathBuf]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_taken_from_the_url_path() {
        let link = ImageLink::new(
            "https://apod.nasa.gov/apod/image/2401/Orion%20Nebula.png?x=1",
            ".jpg",
        );
        assert_eq!(link.extension, ".png");
    }

    #[test]
    fn missing_extension_falls_back_to_default() {
        let link = ImageLink::new("https://example.com/images/latest", ".jpg");
        assert_eq!(link.extension, ".jpg");
        assert_eq!(extension_from_url("not a url"), None);
    }
}
