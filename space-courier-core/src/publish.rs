use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::seq::SliceRandom;
use tracing::{error, info};

use crate::contract::Publisher;
use crate::error::{Error, Result};
use crate::organize::{bucket_folders, files_in};
use crate::settings::{PublishMode, RunSettings};

/// Outcome of one publish stage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Messages the publisher accepted.
    pub sent: usize,
    /// Messages that failed; they are not retried.
    pub failed: usize,
}

/// Walks the bucket folders under `settings.image_dir` and sends them to
/// `settings.chat_id` according to `settings.publish_mode`, pausing
/// `settings.send_delay` between sends.
pub async fn publish_folder<P>(publisher: &P, settings: &RunSettings) -> Result<PublishReport>
where
    P: Publisher + ?Sized,
{
    let buckets = bucket_folders(&settings.image_dir)?;
    info!(
        buckets = buckets.len(),
        mode = ?settings.publish_mode,
        chat_id = %settings.chat_id,
        "[PUBLISH] Starting publish stage"
    );

    let mut report = PublishReport::default();
    match settings.publish_mode {
        PublishMode::Grouped => {
            for (id, folder) in buckets {
                let files = files_in(&folder)?;
                if files.is_empty() {
                    continue;
                }
                if report.sent + report.failed > 0 {
                    pause(settings.send_delay).await;
                }
                let outcome = if files.len() == 1 {
                    publisher.send_photo(&settings.chat_id, &files[0]).await
                } else {
                    publisher.send_media_group(&settings.chat_id, &files).await
                };
                record(&mut report, outcome, &format!("bucket {id}"));
            }
        }
        PublishMode::Single => {
            let mut files = Vec::new();
            for (_, folder) in buckets {
                files.extend(files_in(&folder)?);
            }
            shuffle(&mut files);

            for file in files {
                if report.sent + report.failed > 0 {
                    pause(settings.send_delay).await;
                }
                let outcome = send_single(publisher, settings, &file).await;
                record(&mut report, outcome, &file.display().to_string());
            }
        }
    }

    info!(
        sent = report.sent,
        failed = report.failed,
        "[PUBLISH] Publish stage complete"
    );
    Ok(report)
}

/// Photo when it fits under the size ceiling, document otherwise.
async fn send_single<P>(publisher: &P, settings: &RunSettings, file: &Path) -> Result<()>
where
    P: Publisher + ?Sized,
{
    let size = std::fs::metadata(file)
        .map_err(|e| Error::io(file, e))?
        .len();
    if size <= settings.size_ceiling {
        publisher.send_photo(&settings.chat_id, file).await
    } else {
        publisher.send_document(&settings.chat_id, file).await
    }
}

fn record(report: &mut PublishReport, outcome: Result<()>, what: &str) {
    match outcome {
        Ok(()) => {
            info!(item = %what, "[PUBLISH] Sent");
            report.sent += 1;
        }
        Err(e) => {
            error!(item = %what, error = %e, "[PUBLISH][ERROR] Send failed, not retrying");
            report.failed += 1;
        }
    }
}

fn shuffle(files: &mut [PathBuf]) {
    files.shuffle(&mut rand::thread_rng());
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}
