use notemail_core::{ChangeWatcher, FileChanged, WatchError};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const EVENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Waits for a change event on `target`, ignoring unrelated paths.
async fn next_change_for(events: &mut UnboundedReceiver<FileChanged>, target: &Path) -> FileChanged {
    timeout(EVENT_TIMEOUT, async {
        loop {
            let event = events.recv().await.expect("event stream closed early");
            if event.path == target {
                return event;
            }
        }
    })
    .await
    .expect("no change event within timeout")
}

#[tokio::test]
async fn missing_root_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let mut watcher = ChangeWatcher::new(dir.path().join("does-not-exist"));

    let err = watcher.start().unwrap_err();
    assert!(matches!(err, WatchError::WatchRootMissing(_)));
    assert!(!watcher.is_running());
}

#[tokio::test]
async fn file_root_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("note.md");
    std::fs::write(&file, "x").unwrap();

    let mut watcher = ChangeWatcher::new(&file);
    assert!(matches!(
        watcher.start(),
        Err(WatchError::WatchRootMissing(_))
    ));
}

#[tokio::test]
async fn write_in_nested_directory_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let root = std::fs::canonicalize(dir.path()).unwrap();
    let nested = root.join("projects").join("weekly");
    std::fs::create_dir_all(&nested).unwrap();

    let mut watcher = ChangeWatcher::new(&root);
    let mut events = watcher.start().unwrap();
    assert!(watcher.is_running());

    let note = nested.join("note.md");
    std::fs::write(&note, "#sender: Alice\n").unwrap();

    let event = next_change_for(&mut events, &note).await;
    assert_eq!(event.path, note);
}

#[tokio::test]
async fn second_start_while_running_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut watcher = ChangeWatcher::new(dir.path());

    let _events = watcher.start().unwrap();
    assert!(matches!(watcher.start(), Err(WatchError::AlreadyRunning)));
    assert!(watcher.is_running());
}

#[tokio::test]
async fn stop_closes_stream_and_restart_resubscribes() {
    let dir = tempfile::tempdir().unwrap();
    let root = std::fs::canonicalize(dir.path()).unwrap();
    let note = root.join("note.md");
    std::fs::write(&note, "draft").unwrap();

    let mut watcher = ChangeWatcher::new(&root);
    let mut first = watcher.start().unwrap();
    watcher.stop();
    assert!(!watcher.is_running());

    let closed = timeout(EVENT_TIMEOUT, async {
        while first.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "old stream must close after stop");

    let mut second = watcher.start().unwrap();
    std::fs::write(&note, "draft, edited").unwrap();
    next_change_for(&mut second, &note).await;
}
