//! `load_config` module: builds the immutable [`RunSettings`] from an optional
//! YAML file, CLI overrides and the environment.
//!
//! Precedence, lowest to highest: built-in defaults, YAML file, CLI flags.
//! Secrets (`NASA_TOKEN`, `TELEGRAM_BOT_TOKEN`), the chat id
//! (`TELEGRAM_CHAT_ID`) and the poll delay (`PUBLISH_DELAY`, seconds) only
//! ever come from the environment.
//!
//! A missing or unparsable `PUBLISH_DELAY` is not fatal: it is logged and
//! replaced with [`DEFAULT_POLL_DELAY`].
use anyhow::{Context, Result};
use serde::Deserialize;
use space_courier_core::settings::{
    Endpoints, LaunchSelector, PublishMode, RunSettings, DEFAULT_POLL_DELAY,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub image_dir: Option<PathBuf>,
    pub apod_count: Option<u32>,
    pub epic_lookback_days: Option<u32>,
    pub epic_max_probe_days: Option<u32>,
    pub spacex_launch: Option<LaunchSetting>,
    pub publish_mode: Option<String>,
    pub send_delay_secs: Option<u64>,
    pub size_ceiling_bytes: Option<u64>,
    pub bucket_capacity: Option<usize>,
    #[serde(default)]
    pub endpoints: EndpointsSection,
}

/// `spacex_launch: 16`, or `spacex_launch: latest` / `random`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum LaunchSetting {
    Number(u32),
    Keyword(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointsSection {
    pub spacex: Option<String>,
    pub nasa: Option<String>,
    pub epic: Option<String>,
    pub telegram: Option<String>,
}

/// Values given on the command line; `None` leaves the file/default value alone.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub image_dir: Option<PathBuf>,
    pub apod_count: Option<u32>,
    pub epic_lookback_days: Option<u32>,
    pub spacex_launch: Option<LaunchSelector>,
}

/// Bot API credentials, present only when publishing is requested.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    pub bot_token: String,
}

#[derive(Debug)]
pub struct AppConfig {
    pub settings: RunSettings,
    pub telegram: Option<TelegramConfig>,
}

/// Loads configuration. With `with_publisher` the Telegram token and chat id
/// become mandatory.
pub fn load_config(overrides: &Overrides, with_publisher: bool) -> Result<AppConfig> {
    let file = match &overrides.config {
        Some(path) => read_file_config(path)?,
        None => {
            info!("No config file given, using defaults");
            FileConfig::default()
        }
    };

    let defaults = RunSettings::default();

    let spacex_launch = match (overrides.spacex_launch, file.spacex_launch) {
        (Some(selector), _) => selector,
        (None, Some(LaunchSetting::Number(n))) => LaunchSelector::Number(n),
        (None, Some(LaunchSetting::Keyword(k))) => k
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Invalid spacex_launch: {e}"))?,
        (None, None) => defaults.spacex_launch,
    };

    let publish_mode = match file.publish_mode.as_deref() {
        Some(mode) => mode.parse::<PublishMode>().map_err(|e| {
            error!(mode = %mode, "Unsupported publish_mode in config");
            anyhow::anyhow!("Invalid publish_mode: {e}")
        })?,
        None => defaults.publish_mode,
    };

    let endpoints = Endpoints {
        spacex: file.endpoints.spacex.unwrap_or(defaults.endpoints.spacex),
        nasa: file.endpoints.nasa.unwrap_or(defaults.endpoints.nasa),
        epic: file.endpoints.epic.unwrap_or(defaults.endpoints.epic),
    };

    let nasa_api_key = std::env::var("NASA_TOKEN").map_err(|e| {
        error!(error = ?e, "NASA_TOKEN environment variable not set");
        anyhow::anyhow!("NASA_TOKEN environment variable not set: {e}")
    })?;

    let (chat_id, telegram) = if with_publisher {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN").map_err(|e| {
            error!(error = ?e, "TELEGRAM_BOT_TOKEN environment variable not set");
            anyhow::anyhow!("TELEGRAM_BOT_TOKEN environment variable not set: {e}")
        })?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").map_err(|e| {
            error!(error = ?e, "TELEGRAM_CHAT_ID environment variable not set");
            anyhow::anyhow!("TELEGRAM_CHAT_ID environment variable not set: {e}")
        })?;
        let api_url = file
            .endpoints
            .telegram
            .unwrap_or_else(|| DEFAULT_TELEGRAM_API.to_string());
        (chat_id, Some(TelegramConfig { api_url, bot_token }))
    } else {
        (String::new(), None)
    };

    let settings = RunSettings {
        image_dir: overrides
            .image_dir
            .clone()
            .or(file.image_dir)
            .unwrap_or(defaults.image_dir),
        apod_count: overrides
            .apod_count
            .or(file.apod_count)
            .unwrap_or(defaults.apod_count),
        epic_lookback_days: overrides
            .epic_lookback_days
            .or(file.epic_lookback_days)
            .unwrap_or(defaults.epic_lookback_days),
        epic_max_probe_days: file
            .epic_max_probe_days
            .unwrap_or(defaults.epic_max_probe_days),
        spacex_launch,
        chat_id,
        poll_delay: poll_delay_from_env(),
        send_delay: file
            .send_delay_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.send_delay),
        publish_mode,
        size_ceiling: file.size_ceiling_bytes.unwrap_or(defaults.size_ceiling),
        bucket_capacity: file.bucket_capacity.unwrap_or(defaults.bucket_capacity),
        nasa_api_key,
        endpoints,
    };

    settings.trace_loaded();
    Ok(AppConfig { settings, telegram })
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");
    let content = fs::read_to_string(path)
        .inspect_err(|e| error!(error = ?e, config_path = ?path, "Failed to read config file"))
        .with_context(|| format!("Failed to read config file {path:?}"))?;

    // An empty file is a valid "all defaults" config.
    if content.trim().is_empty() {
        return Ok(FileConfig::default());
    }

    let parsed = serde_yaml::from_str::<FileConfig>(&content).map_err(|e| {
        error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML: {e}")
    })?;
    info!(config_path = ?path, "Parsed config YAML successfully");
    Ok(parsed)
}

/// `PUBLISH_DELAY` in seconds, or the fallback when missing or invalid.
pub fn poll_delay_from_env() -> Duration {
    match std::env::var("PUBLISH_DELAY") {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(secs) => Duration::from_secs(secs),
            Err(e) => {
                warn!(
                    error = ?e,
                    raw = %raw,
                    fallback_secs = DEFAULT_POLL_DELAY.as_secs(),
                    "PUBLISH_DELAY is not a number of seconds, using fallback"
                );
                DEFAULT_POLL_DELAY
            }
        },
        Err(_) => {
            warn!(
                fallback_secs = DEFAULT_POLL_DELAY.as_secs(),
                "PUBLISH_DELAY not set, using fallback"
            );
            DEFAULT_POLL_DELAY
        }
    }
}
