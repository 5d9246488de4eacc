use std::path::PathBuf;

/// Every failure a pipeline stage can report.
///
/// The run loop never aborts on these: a failing stage is logged and the cycle
/// moves on. The variants only exist so the report says *what* went wrong.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, TLS or body-decoding failure from the HTTP client.
    /// Built through `From`, which drops the request URL.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    /// The remote answered with a non-success status. `url` is redacted.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The payload parsed but lacks a field we depend on.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The upstream had nothing for us (no launch with photos, no EPIC day found).
    #[error("no data: {0}")]
    NoData(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// The messaging API refused a send.
    #[error("delivery failed: {0}")]
    Delivery(String),

    #[error("background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

// Request URLs carry credentials (bot token in the path, api_key in the query).
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.without_url())
    }
}

/// `url` with its query string and fragment removed, safe to log.
pub fn redact_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_url_drops_the_query() {
        assert_eq!(
            redact_url("https://api.nasa.gov/EPIC/archive/natural/2024/03/08/png/a.png?api_key=SECRET"),
            "https://api.nasa.gov/EPIC/archive/natural/2024/03/08/png/a.png"
        );
        assert_eq!(redact_url("not a url?api_key=SECRET"), "not a url");
    }
}
