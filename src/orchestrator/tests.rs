use super::*;
use crate::error::DownloadError;
use crate::test_helpers::{FakeExtractor, FakeMediaProcessor, Script, drain_events, items};
use std::sync::atomic::Ordering;
use std::time::Duration;

struct Harness {
    downloader: PlaylistDownloader,
    extractor: Arc<FakeExtractor>,
    rx: broadcast::Receiver<Event>,
    options: RunOptions,
    dir: tempfile::TempDir,
}

fn harness(extractor: FakeExtractor, processor: FakeMediaProcessor) -> Harness {
    harness_with_config(extractor, processor, Config::default())
}

fn harness_with_config(
    extractor: FakeExtractor,
    processor: FakeMediaProcessor,
    mut config: Config,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    config.retry.delay = Duration::from_millis(5);
    config.download.output_dir = dir.path().to_path_buf();

    let extractor = Arc::new(extractor);
    let downloader =
        PlaylistDownloader::with_components(config.clone(), extractor.clone(), Arc::new(processor))
            .unwrap();
    let rx = downloader.subscribe();
    let options = RunOptions::from_config(&config, "test");

    Harness {
        downloader,
        extractor,
        rx,
        options,
        dir,
    }
}

fn archive_entries(archive: &std::path::Path) -> Vec<String> {
    let file = std::fs::File::open(archive).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

fn all_finished_count(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::AllFinished { .. }))
        .count()
}

#[tokio::test]
async fn twenty_three_items_make_three_archive_parts() {
    let mut h = harness(
        FakeExtractor::new(),
        FakeMediaProcessor::new().fail_thumbnail_for("007-"),
    );
    h.options.worker_count = 5;

    let summary = h.downloader.run(items(23), &h.options).await.unwrap();

    assert_eq!(summary.succeeded, 23);
    assert_eq!(summary.failed, 0);
    let expected: Vec<_> = (1..=3)
        .map(|n| h.dir.path().join(format!("test_part_{n}.zip")))
        .collect();
    assert_eq!(summary.archives, expected);

    let sizes: Vec<usize> = expected.iter().map(|a| archive_entries(a).len()).collect();
    assert_eq!(sizes, vec![10, 10, 3]);

    let archived: Vec<String> = expected.iter().flat_map(|a| archive_entries(a)).collect();
    assert!(
        archived.iter().any(|name| name == "007-video 7.mp4"),
        "a thumbnail failure must not keep the item out of the archive"
    );

    let leftovers: Vec<_> = std::fs::read_dir(h.dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| !name.ends_with(".zip"))
        .collect();
    assert!(leftovers.is_empty(), "unexpected files left: {leftovers:?}");

    let events = drain_events(&mut h.rx);
    assert_eq!(all_finished_count(&events), 1);
    assert!(matches!(events.last(), Some(Event::AllFinished { .. })));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::Warning { index: Some(7), message } if message.contains("thumbnail")
    )));
}

#[tokio::test]
async fn single_worker_dispatches_in_index_order() {
    let mut h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    h.options.worker_count = 1;

    h.downloader.run(items(6), &h.options).await.unwrap();

    let expected: Vec<String> = items(6).into_iter().map(|i| i.url).collect();
    assert_eq!(h.extractor.calls(), expected);
}

#[tokio::test]
async fn in_flight_items_never_exceed_worker_count() {
    let mut h = harness(
        FakeExtractor::new().with_delay(Duration::from_millis(20)),
        FakeMediaProcessor::new(),
    );
    h.options.worker_count = 3;

    h.downloader.run(items(12), &h.options).await.unwrap();

    let peak = h.extractor.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {peak} exceeds worker count");
    assert!(peak > 1, "items should overlap with three workers");
}

#[tokio::test]
async fn fully_failed_run_still_finishes_once() {
    let mut extractor = FakeExtractor::new();
    for item in items(4) {
        extractor = extractor.script(&item.url, Script::Fail("ERROR: Private video".into()));
    }
    let mut h = harness(extractor, FakeMediaProcessor::new());

    let summary = h.downloader.run(items(4), &h.options).await.unwrap();

    assert_eq!(summary.failed, 4);
    assert!(summary.archives.is_empty());

    let events = drain_events(&mut h.rx);
    let errors = events
        .iter()
        .filter(|e| matches!(e, Event::Error { .. }))
        .count();
    assert_eq!(errors, 4, "one error event per failed item");
    assert_eq!(all_finished_count(&events), 1);
    assert!(matches!(events.last(), Some(Event::AllFinished { .. })));
}

#[tokio::test]
async fn partial_failure_archives_only_successes() {
    let failing = "https://example.com/watch?v=2";
    let h = harness(
        FakeExtractor::new().script(failing, Script::Fail("ERROR: removed".into())),
        FakeMediaProcessor::new(),
    );

    let summary = h.downloader.run(items(3), &h.options).await.unwrap();

    assert_eq!((summary.succeeded, summary.failed), (2, 1));
    assert_eq!(
        archive_entries(&h.dir.path().join("test_part_1.zip")),
        vec!["001-video 1.mp4", "003-video 3.mp4"]
    );
}

#[tokio::test]
async fn zero_workers_is_a_config_error() {
    let mut h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    h.options.worker_count = 0;

    let err = h.downloader.run(items(2), &h.options).await.unwrap_err();

    assert!(matches!(err, Error::Config { ref key, .. } if key.as_deref() == Some("worker_count")));
    assert!(h.extractor.calls().is_empty());
    assert_eq!(all_finished_count(&drain_events(&mut h.rx)), 0);
}

#[tokio::test]
async fn duplicate_indices_are_rejected_before_dispatch() {
    let h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    let mut batch = items(3);
    batch[2].index = 1;

    let err = h.downloader.run(batch, &h.options).await.unwrap_err();

    assert!(matches!(err, Error::Config { .. }));
    assert!(h.extractor.calls().is_empty());
}

#[tokio::test]
async fn archiving_disabled_leaves_files_in_place() {
    let mut h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    h.options.archive_enabled = false;

    let summary = h.downloader.run(items(3), &h.options).await.unwrap();

    assert!(summary.archives.is_empty());
    let mut files = summary.files.clone();
    files.sort();
    assert_eq!(
        files,
        vec![
            h.dir.path().join("001-video 1.mp4"),
            h.dir.path().join("002-video 2.mp4"),
            h.dir.path().join("003-video 3.mp4"),
        ]
    );
    assert!(files.iter().all(|f| f.exists()));
}

#[tokio::test]
async fn cancelled_token_skips_every_item() {
    let mut h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    h.options.worker_count = 2;
    h.downloader.cancellation_token().cancel();

    let summary = h.downloader.run(items(5), &h.options).await.unwrap();

    assert_eq!(summary.skipped, 5);
    assert!(h.extractor.calls().is_empty());
    let events = drain_events(&mut h.rx);
    assert_eq!(all_finished_count(&events), 1);
    assert!(matches!(events.last(), Some(Event::AllFinished { .. })));
}

#[tokio::test]
async fn directly_cancelled_token_does_not_leak_into_later_runs() {
    let h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    let token = h.downloader.cancellation_token();
    token.cancel();

    let first = h.downloader.run(items(2), &h.options).await.unwrap();
    assert_eq!(first.skipped, 2);

    assert!(!h.downloader.cancellation_token().is_cancelled());
    let second = h.downloader.run(items(2), &h.options).await.unwrap();
    assert_eq!(second.succeeded, 2);
    assert_eq!(second.skipped, 0);
}

#[tokio::test]
async fn cancel_mid_run_lets_in_flight_item_finish() {
    let mut h = harness(
        FakeExtractor::new().with_delay(Duration::from_millis(100)),
        FakeMediaProcessor::new(),
    );
    h.options.worker_count = 1;

    let downloader = Arc::new(h.downloader);
    let options = h.options.clone();
    let run = {
        let downloader = downloader.clone();
        tokio::spawn(async move { downloader.run(items(4), &options).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    downloader.cancel();
    let summary = run.await.unwrap().unwrap();

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.skipped, 3);
    assert_eq!(summary.archives, vec![h.dir.path().join("test_part_1.zip")]);

    // a later run gets a fresh token
    let summary = downloader.run(vec![items(5).remove(4)], &h.options).await.unwrap();
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn sweep_removes_stray_artifacts() {
    let h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    let stray = h.dir.path().join("000-leftover.webp");
    std::fs::write(&stray, b"thumb").unwrap();

    h.downloader.run(items(1), &h.options).await.unwrap();

    assert!(!stray.exists());
}

#[tokio::test]
async fn download_playlist_names_archive_after_title() {
    let playlist = PlaylistInfo {
        title: "Rust: Course/2024".into(),
        items: items(2),
    };
    let mut h = harness(
        FakeExtractor::new().with_playlist(playlist),
        FakeMediaProcessor::new(),
    );
    let options = h.options.clone();

    let summary = h
        .downloader
        .download_playlist("https://example.com/playlist?list=PL1", options)
        .await
        .unwrap();

    let archive = summary.archives[0].file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(archive, format!("{}_part_1.zip", sanitize_filename("Rust: Course/2024")));
    assert!(drain_events(&mut h.rx).iter().any(|e| matches!(
        e,
        Event::Info { index: None, message } if message.contains("2 entries")
    )));
}

#[tokio::test]
async fn unresolvable_playlist_errors_and_finishes() {
    let mut h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    let options = h.options.clone();

    let err = h
        .downloader
        .download_playlist("https://example.com/playlist?list=gone", options)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Download(DownloadError::PlaylistUnavailable { .. })
    ));
    let events = drain_events(&mut h.rx);
    assert!(matches!(events.first(), Some(Event::Error { index: None, .. })));
    assert!(matches!(events.last(), Some(Event::AllFinished { .. })));
}

#[tokio::test]
async fn download_single_uses_index_one() {
    let url = "https://example.com/watch?v=abc";
    let h = harness(
        FakeExtractor::new().title(url, "Lecture"),
        FakeMediaProcessor::new(),
    );
    let mut options = h.options.clone();
    options.archive_enabled = false;

    let summary = h.downloader.download_single(url, options).await.unwrap();

    assert_eq!(summary.files, vec![h.dir.path().join("001-Lecture.mp4")]);
}

#[tokio::test]
async fn blank_archive_name_falls_back_to_default() {
    let mut h = harness(FakeExtractor::new(), FakeMediaProcessor::new());
    h.options.archive_name = "   ".into();

    let summary = h.downloader.run(items(1), &h.options).await.unwrap();

    assert_eq!(
        summary.archives,
        vec![h.dir.path().join(format!("{DEFAULT_ARCHIVE_NAME}_part_1.zip"))]
    );
}
