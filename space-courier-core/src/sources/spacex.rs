use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use super::get_json;
use crate::contract::{ImageLink, ImageSource, SourceKind};
use crate::error::{Error, Result};
use crate::settings::LaunchSelector;

/// Photos of one SpaceX launch, picked per [`LaunchSelector`].
pub struct SpaceXSource {
    client: Client,
    base_url: String,
    selector: LaunchSelector,
}

impl SpaceXSource {
    pub fn new(client: Client, base_url: &str, selector: LaunchSelector) -> Self {
        SpaceXSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            selector,
        }
    }

    /// v3 record for one flight number; photos live under `links.flickr_images`.
    async fn numbered_launch(&self, number: u32) -> Result<Vec<String>> {
        let url = format!("{}/v3/launches/{}", self.base_url, number);
        let launch: Value = get_json(&self.client, &url, &[]).await?;
        let images = launch
            .pointer("/links/flickr_images")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                Error::Malformed(format!("launch {number} has no links.flickr_images"))
            })?;
        Ok(strings(images))
    }

    /// v5 listing reduced to the photo lists of launches that have any,
    /// oldest first. Records without `links.flickr.original` are skipped.
    async fn launches_with_photos(&self) -> Result<Vec<Vec<String>>> {
        let url = format!("{}/v5/launches", self.base_url);
        let launches: Vec<Value> = get_json(&self.client, &url, &[]).await?;
        let mut with_photos: Vec<(i64, Vec<String>)> = launches
            .iter()
            .enumerate()
            .filter_map(|(position, launch)| {
                let Some(originals) = launch
                    .pointer("/links/flickr/original")
                    .and_then(Value::as_array)
                else {
                    debug!(position, "Launch record has no links.flickr.original, skipping");
                    return None;
                };
                let photos = strings(originals);
                (!photos.is_empty()).then(|| (launch_order(launch, position), photos))
            })
            .collect();
        // Stable sort: equal keys keep their listing order.
        with_photos.sort_by_key(|(order, _)| *order);
        Ok(with_photos.into_iter().map(|(_, photos)| photos).collect())
    }
}

/// Sort key for "newest": `date_unix`, then `flight_number`, then listing position.
fn launch_order(launch: &Value, position: usize) -> i64 {
    launch
        .get("date_unix")
        .and_then(Value::as_i64)
        .or_else(|| launch.get("flight_number").and_then(Value::as_i64))
        .unwrap_or(position as i64)
}

fn strings(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

// ThreadRng is !Send, keep it out of the async body.
fn pick_random(candidates: Vec<Vec<String>>) -> Option<Vec<String>> {
    candidates.choose(&mut rand::thread_rng()).cloned()
}

#[async_trait]
impl ImageSource for SpaceXSource {
    fn kind(&self) -> SourceKind {
        SourceKind::SpaceX
    }

    async fn fetch_links(&self) -> Result<Vec<ImageLink>> {
        let urls = match self.selector {
            LaunchSelector::Number(number) => self.numbered_launch(number).await?,
            LaunchSelector::LatestWithPhotos => self
                .launches_with_photos()
                .await?
                .pop()
                .ok_or_else(|| Error::NoData("no SpaceX launch has photos".to_string()))?,
            LaunchSelector::Random => {
                let candidates = self.launches_with_photos().await?;
                pick_random(candidates)
                    .ok_or_else(|| Error::NoData("no SpaceX launch has photos".to_string()))?
            }
        };

        info!(selector = ?self.selector, count = urls.len(), "Collected SpaceX links");
        Ok(urls
            .into_iter()
            .map(|url| ImageLink::new(url, SourceKind::SpaceX.default_extension()))
            .collect())
    }
}
