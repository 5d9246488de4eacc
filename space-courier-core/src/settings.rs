use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::{debug, info};

/// Largest file sent as a photo; anything bigger gets shrunk on download
/// or sent as a document.
pub const DEFAULT_SIZE_CEILING: u64 = 20 * 1024 * 1024;

/// Telegram accepts at most this many items in one media group.
pub const DEFAULT_BUCKET_CAPACITY: usize = 9;

pub const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(4 * 60 * 60);

/// Which SpaceX launch to take photos from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchSelector {
    /// A fixed flight number (v3 API).
    Number(u32),
    /// The most recent launch that has at least one photo.
    LatestWithPhotos,
    /// A uniformly random launch among those with photos.
    Random,
}

impl FromStr for LaunchSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" | "latest_with_photos" => Ok(LaunchSelector::LatestWithPhotos),
            "random" => Ok(LaunchSelector::Random),
            other => other
                .parse::<u32>()
                .map(LaunchSelector::Number)
                .map_err(|_| format!("expected 'latest', 'random' or a launch number, got '{s}'")),
        }
    }
}

/// How the publish stage turns buckets into messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// One media group per bucket folder.
    Grouped,
    /// One message per file, shuffled; oversized files go out as documents.
    Single,
}

impl FromStr for PublishMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grouped" | "group" | "media_group" => Ok(PublishMode::Grouped),
            "single" | "flat" => Ok(PublishMode::Single),
            other => Err(format!("unknown publish mode '{other}'")),
        }
    }
}

/// Base URLs of the upstream APIs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub spacex: String,
    pub nasa: String,
    pub epic: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            spacex: "https://api.spacexdata.com".to_string(),
            nasa: "https://api.nasa.gov".to_string(),
            epic: "https://epic.gsfc.nasa.gov".to_string(),
        }
    }
}

/// Everything a cycle needs, built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub image_dir: PathBuf,
    pub apod_count: u32,
    pub epic_lookback_days: u32,
    /// Upper bound on EPIC date probes before giving up with `NoData`.
    pub epic_max_probe_days: u32,
    pub spacex_launch: LaunchSelector,
    pub chat_id: String,
    pub poll_delay: Duration,
    pub send_delay: Duration,
    pub publish_mode: PublishMode,
    pub size_ceiling: u64,
    pub bucket_capacity: usize,
    pub nasa_api_key: String,
    pub endpoints: Endpoints,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            image_dir: PathBuf::from("images"),
            apod_count: 10,
            epic_lookback_days: 1,
            epic_max_probe_days: 14,
            spacex_launch: LaunchSelector::LatestWithPhotos,
            chat_id: String::new(),
            poll_delay: DEFAULT_POLL_DELAY,
            send_delay: Duration::from_secs(3),
            publish_mode: PublishMode::Single,
            size_ceiling: DEFAULT_SIZE_CEILING,
            bucket_capacity: DEFAULT_BUCKET_CAPACITY,
            nasa_api_key: "DEMO_KEY".to_string(),
            endpoints: Endpoints::default(),
        }
    }
}

impl RunSettings {
    pub fn trace_loaded(&self) {
        info!(
            image_dir = %self.image_dir.display(),
            apod_count = self.apod_count,
            epic_lookback_days = self.epic_lookback_days,
            spacex_launch = ?self.spacex_launch,
            publish_mode = ?self.publish_mode,
            poll_delay_secs = self.poll_delay.as_secs(),
            "Loaded RunSettings"
        );
        debug!(endpoints = ?self.endpoints, "RunSettings endpoints");
    }
}
