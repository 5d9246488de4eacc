//! Run loop: fetch → publish → clean → sleep, forever.
//!
//! One cycle walks the three sources in order, downloading every link into
//! the bucket folders under `image_dir`, then publishes the folder and removes
//! it. Every stage produces a [`StageOutcome`]; a failing stage is logged and
//! the cycle moves on to the next one. Nothing aborts the loop.
//!
//! # Navigation
//! - Single cycle: [`run_cycle`]
//! - Download only: [`fetch_stage`]
//! - Loop: [`run`]

use std::path::Path;

use tracing::{error, info, warn};

use crate::contract::{Downloader, ImageSource, Publisher, SourceKind};
use crate::error::{Error, Result};
use crate::organize::Paginator;
use crate::publish::{publish_folder, PublishReport};
use crate::settings::RunSettings;

/// Count of items a stage handled, or why it failed.
pub type StageOutcome = Result<usize>;

#[derive(Debug)]
pub struct SourceOutcome {
    pub source: SourceKind,
    /// Files downloaded for this source.
    pub outcome: StageOutcome,
}

/// Everything that happened in one cycle.
#[derive(Debug)]
pub struct CycleReport {
    pub fetch: Vec<SourceOutcome>,
    pub publish: Result<PublishReport>,
    /// Whether the working folder was removed.
    pub cleanup: Result<()>,
}

impl CycleReport {
    pub fn downloaded(&self) -> usize {
        self.fetch
            .iter()
            .filter_map(|s| s.outcome.as_ref().ok())
            .sum()
    }

    pub fn failed_sources(&self) -> Vec<SourceKind> {
        self.fetch
            .iter()
            .filter(|s| s.outcome.is_err())
            .map(|s| s.source)
            .collect()
    }
}

/// Downloads every source into bucket folders under `settings.image_dir`.
///
/// The running index is shared across sources, so buckets fill up across
/// source boundaries. A source that fails keeps whatever it already wrote.
pub async fn fetch_stage<D>(
    settings: &RunSettings,
    sources: &[Box<dyn ImageSource>],
    downloader: &D,
) -> Vec<SourceOutcome>
where
    D: Downloader + ?Sized,
{
    let paginator = Paginator::new(settings.bucket_capacity);
    let mut running_index = 0;
    let mut outcomes = Vec::with_capacity(sources.len());

    for source in sources {
        let kind = source.kind();
        info!(source = %kind, "[FETCH] Starting source");
        let outcome =
            fetch_source(source.as_ref(), downloader, &paginator, settings, &mut running_index)
                .await;
        match &outcome {
            Ok(count) => info!(source = %kind, count, "[FETCH] Source done"),
            Err(e) => error!(source = %kind, error = %e, "[FETCH][ERROR] Source failed, moving on"),
        }
        outcomes.push(SourceOutcome {
            source: kind,
            outcome,
        });
    }
    outcomes
}

async fn fetch_source<D>(
    source: &dyn ImageSource,
    downloader: &D,
    paginator: &Paginator,
    settings: &RunSettings,
    running_index: &mut usize,
) -> StageOutcome
where
    D: Downloader + ?Sized,
{
    let links = source.fetch_links().await?;
    let stem = source.kind().file_stem();

    for (number, link) in links.iter().enumerate() {
        let (folder, next) = paginator.place(&settings.image_dir, *running_index)?;
        *running_index = next;
        let destination = folder.join(format!("{stem}{number}{}", link.extension));
        downloader.fetch(&link.url, &destination).await?;
    }
    Ok(links.len())
}

/// One full cycle: clear stale folder, fetch all sources, publish, clean up.
pub async fn run_cycle<D, P>(
    settings: &RunSettings,
    sources: &[Box<dyn ImageSource>],
    downloader: &D,
    publisher: &P,
) -> CycleReport
where
    D: Downloader + ?Sized,
    P: Publisher + ?Sized,
{
    if settings.image_dir.exists() {
        warn!(path = %settings.image_dir.display(), "Stale working folder found, removing");
        if let Err(e) = remove_working_folder(&settings.image_dir).await {
            warn!(error = %e, "Could not remove stale working folder");
        }
    }
    if let Err(e) = tokio::fs::create_dir_all(&settings.image_dir).await {
        error!(error = ?e, path = %settings.image_dir.display(), "Failed to create working folder");
    }

    let fetch = fetch_stage(settings, sources, downloader).await;

    let publish = publish_folder(publisher, settings).await;
    if let Err(e) = &publish {
        error!(error = %e, "[PUBLISH][ERROR] Publish stage failed, moving on");
    }

    let cleanup = remove_working_folder(&settings.image_dir).await;
    match &cleanup {
        Ok(()) => info!(path = %settings.image_dir.display(), "[CLEAN] Working folder removed"),
        Err(e) => error!(error = %e, "[CLEAN][ERROR] Failed to remove working folder"),
    }

    CycleReport {
        fetch,
        publish,
        cleanup,
    }
}

async fn remove_working_folder(path: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Repeats [`run_cycle`] separated by `settings.poll_delay`.
///
/// With `max_cycles` of `None` this never returns. Reports are logged, not kept.
pub async fn run<D, P>(
    settings: &RunSettings,
    sources: &[Box<dyn ImageSource>],
    downloader: &D,
    publisher: &P,
    max_cycles: Option<u64>,
) where
    D: Downloader + ?Sized,
    P: Publisher + ?Sized,
{
    let mut cycle: u64 = 0;
    loop {
        cycle += 1;
        info!(cycle, "[CYCLE] Starting");
        let report = run_cycle(settings, sources, downloader, publisher).await;
        info!(
            cycle,
            downloaded = report.downloaded(),
            failed_sources = ?report.failed_sources(),
            published = ?report.publish.as_ref().ok(),
            cleaned = report.cleanup.is_ok(),
            "[CYCLE] Finished"
        );

        if max_cycles.is_some_and(|max| cycle >= max) {
            break;
        }
        info!(secs = settings.poll_delay.as_secs(), "[CYCLE] Sleeping");
        tokio::time::sleep(settings.poll_delay).await;
    }
}
