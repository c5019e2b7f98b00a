//! Event collection and archive inspection helpers

use playlist_dl::Event;
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Collect events until `all_finished` arrives or the timeout elapses
///
/// Subscribe before starting the run, then spawn this so the channel is
/// drained while items complete.
pub async fn collect_until_finished(
    mut events: broadcast::Receiver<Event>,
    timeout: Duration,
) -> Vec<Event> {
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let done = matches!(event, Event::AllFinished { .. });
            collected.push(event);
            if done {
                break;
            }
        }
    })
    .await;

    collected
}

/// Sorted entry names of a zip archive
pub fn archive_entries(archive: &Path) -> Vec<String> {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    names.sort();
    names
}

/// Assert that the last collected event is the only `all_finished`
pub fn assert_finished_once(events: &[Event]) {
    let finished = events
        .iter()
        .filter(|e| matches!(e, Event::AllFinished { .. }))
        .count();
    assert_eq!(finished, 1, "expected exactly one all_finished event");
    assert!(
        matches!(events.last(), Some(Event::AllFinished { .. })),
        "all_finished must be the last event"
    );
}
