use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::get_json;
use crate::contract::{ImageLink, ImageSource, SourceKind};
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct ApodEntry {
    #[serde(default)]
    media_type: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// NASA Astronomy Picture of the Day, `count` random entries per call.
pub struct ApodSource {
    client: Client,
    base_url: String,
    api_key: String,
    count: u32,
}

impl ApodSource {
    pub fn new(client: Client, base_url: &str, api_key: &str, count: u32) -> Self {
        ApodSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            count,
        }
    }
}

#[async_trait]
impl ImageSource for ApodSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Apod
    }

    async fn fetch_links(&self) -> Result<Vec<ImageLink>> {
        let url = format!("{}/planetary/apod", self.base_url);
        let entries: Vec<ApodEntry> = get_json(
            &self.client,
            &url,
            &[
                ("count", self.count.to_string()),
                ("api_key", self.api_key.clone()),
            ],
        )
        .await?;

        let total = entries.len();
        let links: Vec<ImageLink> = entries
            .into_iter()
            .filter(|entry| entry.media_type.as_deref() == Some("image"))
            .filter_map(|entry| match entry.url {
                Some(url) => Some(ImageLink::new(url, SourceKind::Apod.default_extension())),
                None => {
                    warn!("APOD image entry without url, skipping");
                    None
                }
            })
            .collect();

        info!(total, images = links.len(), "Collected APOD links");
        Ok(links)
    }
}
