use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::tempdir;

use space_courier_core::contract::{
    ImageLink, ImageSource, MockDownloader, MockImageSource, MockPublisher, SourceKind,
};
use space_courier_core::cycle::{fetch_stage, run, run_cycle};
use space_courier_core::error::Error;
use space_courier_core::settings::{PublishMode, RunSettings};

fn settings_in(dir: &Path, mode: PublishMode) -> RunSettings {
    RunSettings {
        image_dir: dir.join("images"),
        chat_id: "@space_pictures".to_string(),
        send_delay: Duration::ZERO,
        poll_delay: Duration::ZERO,
        publish_mode: mode,
        ..RunSettings::default()
    }
}

fn source_with(kind: SourceKind, count: usize) -> Box<dyn ImageSource> {
    let mut source = MockImageSource::new();
    source.expect_kind().return_const(kind);
    source.expect_fetch_links().returning(move || {
        Ok((0..count)
            .map(|i| ImageLink::new(format!("https://img.test/{kind}/{i}"), kind.default_extension()))
            .collect())
    });
    Box::new(source)
}

fn failing_source(kind: SourceKind) -> Box<dyn ImageSource> {
    let mut source = MockImageSource::new();
    source.expect_kind().return_const(kind);
    source.expect_fetch_links().returning(move || {
        Err(Error::Status {
            status: 503,
            url: format!("https://img.test/{kind}"),
        })
    });
    Box::new(source)
}

/// Writes `size` bytes to every destination it is asked to fetch.
fn writing_downloader(size: usize) -> MockDownloader {
    let mut downloader = MockDownloader::new();
    downloader.expect_fetch().returning(move |_url, destination| {
        std::fs::write(destination, vec![7u8; size]).unwrap();
        Ok(())
    });
    downloader
}

#[tokio::test]
async fn test_cycle_downloads_publishes_and_cleans() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path(), PublishMode::Single);
    let sources = vec![
        source_with(SourceKind::SpaceX, 2),
        source_with(SourceKind::Apod, 3),
        source_with(SourceKind::Epic, 1),
    ];
    let downloader = writing_downloader(16);

    let sent: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));
    let mut publisher = MockPublisher::new();
    let seen = sent.clone();
    publisher
        .expect_send_photo()
        .times(6)
        .returning(move |chat_id, path| {
            assert_eq!(chat_id, "@space_pictures");
            assert!(path.exists(), "file must exist while publishing");
            seen.lock().unwrap().push(path.to_path_buf());
            Ok(())
        });
    publisher.expect_send_document().never();
    publisher.expect_send_media_group().never();

    let report = run_cycle(&settings, &sources, &downloader, &publisher).await;

    assert_eq!(report.downloaded(), 6);
    assert!(report.failed_sources().is_empty());
    let publish = report.publish.expect("publish stage should succeed");
    assert_eq!(publish.sent, 6);
    assert_eq!(publish.failed, 0);
    assert!(report.cleanup.is_ok());
    assert!(!settings.image_dir.exists(), "working folder must be removed");

    let sent = sent.lock().unwrap();
    assert!(sent
        .iter()
        .all(|p| p.parent().unwrap() == settings.image_dir.join("0")));
    let mut names: Vec<String> = sent
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "nasa_apod0.jpg",
            "nasa_apod1.jpg",
            "nasa_apod2.jpg",
            "nasa_epic0.png",
            "spacex0.jpg",
            "spacex1.jpg"
        ]
    );
}

#[tokio::test]
async fn test_failing_source_does_not_stop_the_others() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path(), PublishMode::Single);
    let sources = vec![
        failing_source(SourceKind::SpaceX),
        source_with(SourceKind::Apod, 2),
        source_with(SourceKind::Epic, 2),
    ];
    let downloader = writing_downloader(16);

    let mut publisher = MockPublisher::new();
    publisher.expect_send_photo().times(4).returning(|_, _| Ok(()));

    let report = run_cycle(&settings, &sources, &downloader, &publisher).await;

    assert_eq!(report.failed_sources(), vec![SourceKind::SpaceX]);
    assert_eq!(report.downloaded(), 4);
    assert_eq!(report.publish.unwrap().sent, 4);
    assert!(!settings.image_dir.exists());
}

#[tokio::test]
async fn test_failed_sends_are_counted_not_retried() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path(), PublishMode::Single);
    let sources = vec![source_with(SourceKind::Apod, 3)];
    let downloader = writing_downloader(16);

    let mut publisher = MockPublisher::new();
    let calls = Arc::new(Mutex::new(0usize));
    let counter = calls.clone();
    publisher.expect_send_photo().times(3).returning(move |_, _| {
        let mut n = counter.lock().unwrap();
        *n += 1;
        if *n == 2 {
            Err(Error::Delivery("Too Many Requests".to_string()))
        } else {
            Ok(())
        }
    });

    let report = run_cycle(&settings, &sources, &downloader, &publisher).await;
    let publish = report.publish.unwrap();
    assert_eq!(publish.sent, 2);
    assert_eq!(publish.failed, 1);
}

#[tokio::test]
async fn test_grouped_mode_sends_one_group_per_bucket() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path(), PublishMode::Grouped);
    let sources = vec![source_with(SourceKind::SpaceX, 6), source_with(SourceKind::Apod, 4)];
    let downloader = writing_downloader(16);

    let mut publisher = MockPublisher::new();
    publisher
        .expect_send_media_group()
        .times(1)
        .withf(|_, paths| paths.len() == 9)
        .returning(|_, _| Ok(()));
    publisher
        .expect_send_photo()
        .times(1)
        .withf(|_, path| path.ends_with("1/nasa_apod3.jpg"))
        .returning(|_, _| Ok(()));

    let report = run_cycle(&settings, &sources, &downloader, &publisher).await;
    assert_eq!(report.downloaded(), 10);
    assert_eq!(report.publish.unwrap().sent, 2);
}

#[tokio::test]
async fn test_oversized_files_go_out_as_documents() {
    let temp = tempdir().unwrap();
    let settings = RunSettings {
        size_ceiling: 1024,
        ..settings_in(temp.path(), PublishMode::Single)
    };
    let sources = vec![source_with(SourceKind::Epic, 2)];
    let downloader = writing_downloader(4096);

    let mut publisher = MockPublisher::new();
    publisher.expect_send_document().times(2).returning(|_, _| Ok(()));
    publisher.expect_send_photo().never();

    let report = run_cycle(&settings, &sources, &downloader, &publisher).await;
    assert_eq!(report.publish.unwrap().sent, 2);
}

#[tokio::test]
async fn test_fetch_stage_keeps_files_on_disk() {
    let temp = tempdir().unwrap();
    let settings = RunSettings {
        bucket_capacity: 2,
        ..settings_in(temp.path(), PublishMode::Single)
    };
    let sources = vec![source_with(SourceKind::SpaceX, 3)];
    let downloader = writing_downloader(8);

    let outcomes = fetch_stage(&settings, &sources, &downloader).await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(*outcomes[0].outcome.as_ref().unwrap(), 3);
    assert!(settings.image_dir.join("0/spacex0.jpg").exists());
    assert!(settings.image_dir.join("0/spacex1.jpg").exists());
    assert!(settings.image_dir.join("1/spacex2.jpg").exists());
}

#[tokio::test]
async fn test_run_repeats_cycles_until_limit() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path(), PublishMode::Single);

    let mut source = MockImageSource::new();
    source.expect_kind().return_const(SourceKind::Apod);
    source
        .expect_fetch_links()
        .times(2)
        .returning(|| Ok(vec![ImageLink::new("https://img.test/a.jpg", ".jpg")]));
    let sources: Vec<Box<dyn ImageSource>> = vec![Box::new(source)];
    let downloader = writing_downloader(8);

    let mut publisher = MockPublisher::new();
    publisher.expect_send_photo().times(2).returning(|_, _| Ok(()));

    run(&settings, &sources, &downloader, &publisher, Some(2)).await;
    assert!(!settings.image_dir.exists());
}

#[tokio::test]
async fn test_stale_working_folder_is_cleared_before_fetching() {
    let temp = tempdir().unwrap();
    let settings = settings_in(temp.path(), PublishMode::Single);
    std::fs::create_dir_all(settings.image_dir.join("0")).unwrap();
    std::fs::write(settings.image_dir.join("0").join("leftover.jpg"), b"old").unwrap();
    std::fs::create_dir_all(settings.image_dir.join("3")).unwrap();
    std::fs::write(settings.image_dir.join("3").join("orphan.jpg"), b"old").unwrap();

    let sources = vec![source_with(SourceKind::Apod, 2)];
    let downloader = writing_downloader(16);

    let sent: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let mut publisher = MockPublisher::new();
    let seen = sent.clone();
    publisher.expect_send_photo().returning(move |_chat_id, path| {
        seen.lock()
            .unwrap()
            .push(path.file_name().unwrap().to_string_lossy().into_owned());
        Ok(())
    });
    publisher.expect_send_document().never();
    publisher.expect_send_media_group().never();

    let report = run_cycle(&settings, &sources, &downloader, &publisher).await;

    assert_eq!(report.publish.expect("publish stage should succeed").sent, 2);
    let mut sent = sent.lock().unwrap().clone();
    sent.sort();
    assert_eq!(sent, vec!["nasa_apod0.jpg", "nasa_apod1.jpg"]);
    assert!(report.cleanup.is_ok());
    assert!(!settings.image_dir.exists(), "working folder must be removed");
}
