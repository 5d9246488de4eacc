//!
//! CLI glue for space-courier: command parsing and wiring of the core
//! pipeline to real collaborators (HTTP downloader, Telegram publisher).
//!
//! All pipeline logic lives in `space-courier-core`; this module only
//! turns flags into [`Overrides`], loads config and calls into the core.
//!
//! ## How To Use
//! - Binary users: `space-courier --help`.
//! - Programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::load_config::{load_config, Overrides};
use crate::telegram::TelegramClient;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use space_courier_core::cycle;
use space_courier_core::download::HttpDownloader;
use space_courier_core::settings::LaunchSelector;
use space_courier_core::sources::default_sources;
use std::path::PathBuf;

/// CLI for space-courier: fetch space imagery and post it to Telegram.
#[derive(Parser)]
#[clap(
    name = "space-courier",
    version,
    about = "Fetch SpaceX and NASA imagery and post it to a Telegram channel on a timer"
)]
pub struct Cli {
    /// Append-only log file
    #[clap(long, global = true, default_value = "space-courier.log")]
    pub log_file: PathBuf,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, publish, clean up and sleep; forever unless --cycles is given
    Run {
        #[clap(flatten)]
        source: SourceArgs,
        /// Stop after this many cycles
        #[clap(long)]
        cycles: Option<u64>,
    },
    /// Download one round of images into the image folder and keep them
    Fetch {
        #[clap(flatten)]
        source: SourceArgs,
    },
}

#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Working folder for downloaded images
    #[clap(long)]
    pub folder: Option<PathBuf>,
    /// Number of APOD images to request
    #[clap(long)]
    pub count: Option<u32>,
    /// How many days back EPIC probing starts
    #[clap(long)]
    pub days: Option<u32>,
    /// SpaceX launch: "latest", "random" or a flight number
    #[clap(long)]
    pub launch: Option<LaunchSelector>,
}

impl SourceArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config: self.config.clone(),
            image_dir: self.folder.clone(),
            apod_count: self.count,
            epic_lookback_days: self.days,
            spacex_launch: self.launch,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let client = reqwest::Client::new();

    match cli.command {
        Commands::Run { source, cycles } => {
            let config = load_config(&source.overrides(), true)?;
            let telegram = config
                .telegram
                .ok_or_else(|| anyhow::anyhow!("Telegram configuration missing"))?;
            let settings = config.settings;

            let publisher =
                TelegramClient::new(client.clone(), &telegram.api_url, &telegram.bot_token);
            let downloader = HttpDownloader::new(client.clone(), settings.size_ceiling);
            let sources = default_sources(&client, &settings);

            tracing::info!(command = "run", ?cycles, "Starting run loop");
            cycle::run(&settings, &sources, &downloader, &publisher, cycles).await;
            Ok(())
        }
        Commands::Fetch { source } => {
            let config = load_config(&source.overrides(), false)?;
            let settings = config.settings;

            let downloader = HttpDownloader::new(client.clone(), settings.size_ceiling);
            let sources = default_sources(&client, &settings);

            tokio::fs::create_dir_all(&settings.image_dir).await?;
            let outcomes = cycle::fetch_stage(&settings, &sources, &downloader).await;
            for outcome in &outcomes {
                match &outcome.outcome {
                    Ok(count) => println!("{}: {} images", outcome.source, count),
                    Err(e) => println!("{}: failed ({})", outcome.source, e),
                }
            }
            tracing::info!(command = "fetch", "Fetch complete");
            println!(
                "Done! Check the \"{}\" folder for results!",
                settings.image_dir.display()
            );
            Ok(())
        }
    }
}
