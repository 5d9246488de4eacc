use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{imageops::FilterType, ImageFormat};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use crate::contract::Downloader;
use crate::error::{redact_url, Error, Result};

/// Extra margin applied on top of the area ratio, so one pass usually lands under the ceiling.
const SHRINK_FACTOR: f64 = 0.9;

/// Each shrink pass re-encodes the file; stop trying after this many.
const MAX_SHRINK_PASSES: usize = 8;

/// Fetches over HTTP and shrinks files larger than `size_ceiling`.
pub struct HttpDownloader {
    client: Client,
    size_ceiling: u64,
}

impl HttpDownloader {
    pub fn new(client: Client, size_ceiling: u64) -> Self {
        Self {
            client,
            size_ceiling,
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        let shown_url = redact_url(url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %shown_url, "Image download returned error status");
            return Err(Error::Status {
                status: status.as_u16(),
                url: shown_url,
            });
        }
        let body = response.bytes().await?;
        tokio::fs::write(destination, &body)
            .await
            .map_err(|e| Error::io(destination, e))?;
        debug!(url = %shown_url, path = %destination.display(), bytes = body.len(), "Wrote image");

        if body.len() as u64 > self.size_ceiling {
            let path = destination.to_path_buf();
            let ceiling = self.size_ceiling;
            tokio::task::spawn_blocking(move || shrink_to_ceiling(&path, ceiling)).await??;
        }
        Ok(())
    }
}

/// Re-encodes the image at `path` in place, scaled down proportionally,
/// until the file is at or under `ceiling` bytes. Lossy.
pub fn shrink_to_ceiling(path: &Path, ceiling: u64) -> Result<u64> {
    let mut size = file_size(path)?;
    if size <= ceiling {
        return Ok(size);
    }

    let format = ImageFormat::from_path(path).or_else(|_| {
        image::ImageReader::open(path)
            .map_err(|e| Error::io(path, e))?
            .with_guessed_format()
            .map_err(|e| Error::io(path, e))?
            .format()
            .ok_or_else(|| Error::Malformed(format!("{} is not a known image format", path.display())))
    })?;

    let original = image::open(path)?;
    let (mut width, mut height) = (original.width(), original.height());
    info!(
        path = %path.display(),
        size,
        ceiling,
        width,
        height,
        "Image exceeds size ceiling, shrinking"
    );

    for pass in 0..MAX_SHRINK_PASSES {
        let ratio = ((ceiling as f64 / size as f64).sqrt() * SHRINK_FACTOR).min(SHRINK_FACTOR);
        width = ((width as f64 * ratio) as u32).max(1);
        height = ((height as f64 * ratio) as u32).max(1);

        let resized = original.resize_exact(width, height, FilterType::Lanczos3);
        resized.save_with_format(path, format)?;
        size = file_size(path)?;
        debug!(pass, width, height, size, "Shrink pass complete");

        if size <= ceiling {
            info!(path = %path.display(), size, width, height, "Image shrunk under ceiling");
            return Ok(size);
        }
        if width == 1 && height == 1 {
            break;
        }
    }

    warn!(path = %path.display(), size, ceiling, "Could not shrink image under ceiling");
    Ok(size)
}

fn file_size(path: &Path) -> Result<u64> {
    std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| Error::io(PathBuf::from(path), e))
}
