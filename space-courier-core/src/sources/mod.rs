//! Source adapters: SpaceX launch photos, NASA APOD and NASA EPIC.
//!
//! Each adapter does one blocking-style read (EPIC may probe several days)
//! and projects the JSON into [`ImageLink`](crate::contract::ImageLink)s.

mod apod;
mod epic;
mod spacex;

pub use apod::ApodSource;
pub use epic::EpicSource;
pub use spacex::SpaceXSource;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::contract::ImageSource;
use crate::error::{redact_url, Error, Result};
use crate::settings::RunSettings;

/// The three adapters in their fixed run order: SpaceX, APOD, EPIC.
pub fn default_sources(client: &Client, settings: &RunSettings) -> Vec<Box<dyn ImageSource>> {
    vec![
        Box::new(SpaceXSource::new(
            client.clone(),
            &settings.endpoints.spacex,
            settings.spacex_launch,
        )),
        Box::new(ApodSource::new(
            client.clone(),
            &settings.endpoints.nasa,
            &settings.nasa_api_key,
            settings.apod_count,
        )),
        Box::new(EpicSource::new(
            client.clone(),
            &settings.endpoints.epic,
            &settings.endpoints.nasa,
            &settings.nasa_api_key,
            settings.epic_lookback_days,
            settings.epic_max_probe_days,
        )),
    ]
}

/// GET `url` and decode the body as JSON. Any non-2xx status is an error.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
) -> Result<T> {
    let shown_url = redact_url(url);
    debug!(url = %shown_url, "Requesting JSON");
    let response = client.get(url).query(query).send().await?;
    let status = response.status();
    if !status.is_success() {
        error!(status = %status, url = %shown_url, "Upstream returned error status");
        return Err(Error::Status {
            status: status.as_u16(),
            url: shown_url,
        });
    }
    Ok(response.json::<T>().await?)
}
