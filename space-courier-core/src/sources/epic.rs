use async_trait::async_trait;
use chrono::{Days, Local, NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::get_json;
use crate::contract::{ImageLink, ImageSource, SourceKind};
use crate::error::{Error, Result};

const EPIC_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct EpicEntry {
    image: String,
    date: String,
}

/// NASA EPIC natural-colour Earth images for the most recent day that has any.
///
/// Probing starts `lookback_days` before today and walks further back one day
/// at a time, at most `max_probe_days` requests.
pub struct EpicSource {
    client: Client,
    api_url: String,
    archive_url: String,
    api_key: String,
    lookback_days: u32,
    max_probe_days: u32,
    today: Option<NaiveDate>,
}

impl EpicSource {
    pub fn new(
        client: Client,
        api_url: &str,
        archive_url: &str,
        api_key: &str,
        lookback_days: u32,
        max_probe_days: u32,
    ) -> Self {
        EpicSource {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            archive_url: archive_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            lookback_days,
            max_probe_days,
            today: None,
        }
    }

    /// Pin "today" instead of reading the local clock.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    fn archive_link(&self, entry: &EpicEntry) -> Result<ImageLink> {
        let taken = NaiveDateTime::parse_from_str(&entry.date, EPIC_DATE_FORMAT).map_err(|e| {
            Error::Malformed(format!("EPIC date '{}' unparsable: {e}", entry.date))
        })?;
        let url = format!(
            "{}/EPIC/archive/natural/{}/png/{}.png?api_key={}",
            self.archive_url,
            taken.format("%Y/%m/%d"),
            entry.image,
            self.api_key
        );
        Ok(ImageLink::new(url, SourceKind::Epic.default_extension()))
    }
}

#[async_trait]
impl ImageSource for EpicSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Epic
    }

    async fn fetch_links(&self) -> Result<Vec<ImageLink>> {
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        for probe in 0..self.max_probe_days {
            let offset = u64::from(self.lookback_days) + u64::from(probe);
            let Some(day) = today.checked_sub_days(Days::new(offset)) else {
                return Err(Error::NoData(format!(
                    "EPIC date {offset} days before {today} is out of calendar range"
                )));
            };
            let url = format!("{}/api/natural/date/{}", self.api_url, day.format("%Y-%m-%d"));

            let entries: Vec<EpicEntry> = get_json(&self.client, &url, &[]).await?;
            if entries.is_empty() {
                debug!(%day, probe, "EPIC day has no images, probing further back");
                continue;
            }

            let links = entries
                .iter()
                .map(|entry| self.archive_link(entry))
                .collect::<Result<Vec<_>>>()?;
            info!(%day, count = links.len(), "Collected EPIC links");
            return Ok(links);
        }

        Err(Error::NoData(format!(
            "no EPIC images within {} days starting {} days back",
            self.max_probe_days, self.lookback_days
        )))
    }
}
