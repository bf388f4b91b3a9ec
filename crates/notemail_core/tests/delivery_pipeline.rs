mod support;

use notemail_core::db::DbError;
use notemail_core::{
    DeliveryPipeline, DeliveryStatus, FileAnnotator, FileChanged, Ledger, LedgerError,
    LedgerResult, MailError, Outcome, ProcessedRecord, SkipReason, SqliteLedger, StatusAnnotator,
};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{RecordingMailer, COMPLETE_NOTE};
use tempfile::TempDir;

const RECIPIENT: &str = "boss@example.com";

struct Fixture {
    dir: TempDir,
    ledger: Arc<SqliteLedger>,
    mailer: Arc<RecordingMailer>,
    pipeline: DeliveryPipeline,
}

impl Fixture {
    fn new(mailer: RecordingMailer) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(SqliteLedger::open(dir.path().join("ledger.db")).unwrap());
        let mailer = Arc::new(mailer);
        let pipeline = DeliveryPipeline::new(
            ledger.clone(),
            mailer.clone(),
            Arc::new(FileAnnotator),
            RECIPIENT,
        );
        Self {
            dir,
            ledger,
            mailer,
            pipeline,
        }
    }

    fn write_note(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

fn changed_at(path: &Path, timestamp: Instant) -> FileChanged {
    FileChanged {
        path: path.to_path_buf(),
        timestamp,
    }
}

fn annotation_pattern(status: &str) -> Regex {
    Regex::new(&format!(
        r"^\nServer Sent Timestamp: \d{{2}}:\d{{2}} (AM|PM) - \d{{2}}/\d{{2}}/\d{{2}} : {status}\n$"
    ))
    .unwrap()
}

#[test]
fn complete_note_is_mailed_recorded_and_annotated() {
    let fixture = Fixture::new(RecordingMailer::default());
    let note = fixture.write_note("monday.md", COMPLETE_NOTE);

    let outcome = fixture.pipeline.handle(&FileChanged::now(&note));
    assert_eq!(outcome, Outcome::Delivered);

    let sent = fixture.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, RECIPIENT);
    assert!(Regex::new(r"^Alice- \d{4}-\d{2}-\d{2}$")
        .unwrap()
        .is_match(&sent[0].subject));
    assert!(sent[0].body.starts_with("Alice - "));
    assert!(sent[0]
        .body
        .contains(":\n\n\u{2022} - buy milk\n\u{2022} - call Bob\n\n\n\n\n\n"));

    assert!(fixture.ledger.has(&note).unwrap());

    let content = std::fs::read_to_string(&note).unwrap();
    let appended = content
        .strip_prefix(COMPLETE_NOTE)
        .expect("original content must be preserved");
    assert!(
        annotation_pattern("sent OK").is_match(appended),
        "unexpected annotation: {appended:?}"
    );
}

#[test]
fn delivered_note_is_never_mailed_again() {
    let fixture = Fixture::new(RecordingMailer::default());
    let note = fixture.write_note("monday.md", COMPLETE_NOTE);
    let start = Instant::now();

    assert_eq!(
        fixture.pipeline.handle(&changed_at(&note, start)),
        Outcome::Delivered
    );
    // The annotation write and later edits all land well outside the window.
    for offset in [2, 5, 60] {
        let later = changed_at(&note, start + Duration::from_secs(offset));
        assert_eq!(
            fixture.pipeline.handle(&later),
            Outcome::Skipped(SkipReason::AlreadyProcessed)
        );
    }
    assert_eq!(fixture.mailer.attempts(), 1);
}

#[test]
fn ledger_survives_pipeline_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger.db");
    let note = dir.path().join("note.md");
    std::fs::write(&note, COMPLETE_NOTE).unwrap();

    let first_mailer = Arc::new(RecordingMailer::default());
    let first = DeliveryPipeline::new(
        Arc::new(SqliteLedger::open(&db_path).unwrap()),
        first_mailer.clone(),
        Arc::new(FileAnnotator),
        RECIPIENT,
    );
    assert_eq!(first.handle(&FileChanged::now(&note)), Outcome::Delivered);
    drop(first);

    let second_mailer = Arc::new(RecordingMailer::default());
    let second = DeliveryPipeline::new(
        Arc::new(SqliteLedger::open(&db_path).unwrap()),
        second_mailer.clone(),
        Arc::new(FileAnnotator),
        RECIPIENT,
    );
    assert_eq!(
        second.handle(&FileChanged::now(&note)),
        Outcome::Skipped(SkipReason::AlreadyProcessed)
    );
    assert_eq!(first_mailer.attempts(), 1);
    assert_eq!(second_mailer.attempts(), 0);
}

#[test]
fn incomplete_note_is_skipped_without_side_effects() {
    let fixture = Fixture::new(RecordingMailer::default());
    let draft = "#sender: Alice\n- buy milk\n";
    let note = fixture.write_note("draft.md", draft);

    assert_eq!(
        fixture.pipeline.handle(&FileChanged::now(&note)),
        Outcome::Skipped(SkipReason::Incomplete)
    );
    assert_eq!(fixture.mailer.attempts(), 0);
    assert!(!fixture.ledger.has(&note).unwrap());
    assert_eq!(std::fs::read_to_string(&note).unwrap(), draft);
}

#[test]
fn rapid_second_event_is_debounced() {
    let fixture = Fixture::new(RecordingMailer::failing(MailError::Transport(
        "connection refused".to_string(),
    )));
    let note = fixture.write_note("note.md", COMPLETE_NOTE);
    let start = Instant::now();

    let first = fixture.pipeline.handle(&changed_at(&note, start));
    assert!(matches!(first, Outcome::DeliveryFailed(_)));

    let second = fixture
        .pipeline
        .handle(&changed_at(&note, start + Duration::from_millis(500)));
    assert_eq!(second, Outcome::Skipped(SkipReason::Debounced));
    assert_eq!(fixture.mailer.attempts(), 1);
}

#[test]
fn debounce_is_tracked_per_path() {
    let fixture = Fixture::new(RecordingMailer::default());
    let first = fixture.write_note("a.md", COMPLETE_NOTE);
    let second = fixture.write_note("b.md", COMPLETE_NOTE);
    let start = Instant::now();

    assert_eq!(
        fixture.pipeline.handle(&changed_at(&first, start)),
        Outcome::Delivered
    );
    assert_eq!(
        fixture
            .pipeline
            .handle(&changed_at(&second, start + Duration::from_millis(10))),
        Outcome::Delivered
    );
    assert_eq!(fixture.mailer.attempts(), 2);
}

#[test]
fn failed_delivery_is_annotated_and_retried_after_edit() {
    for failure in [
        MailError::Transport("connection refused".to_string()),
        MailError::Authentication("535 bad credentials".to_string()),
    ] {
        let fixture = Fixture::new(RecordingMailer::failing(failure.clone()));
        let note = fixture.write_note("note.md", COMPLETE_NOTE);
        let start = Instant::now();

        let outcome = fixture.pipeline.handle(&changed_at(&note, start));
        assert_eq!(outcome, Outcome::DeliveryFailed(failure));
        assert!(!fixture.ledger.has(&note).unwrap());

        let content = std::fs::read_to_string(&note).unwrap();
        let appended = content.strip_prefix(COMPLETE_NOTE).unwrap();
        assert!(annotation_pattern("sent Failed").is_match(appended));

        fixture.mailer.fail_with(None);
        let retry = changed_at(&note, start + Duration::from_secs(2));
        assert_eq!(fixture.pipeline.handle(&retry), Outcome::Delivered);
        assert!(fixture.ledger.has(&note).unwrap());
        assert_eq!(fixture.mailer.attempts(), 2);
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let fixture = Fixture::new(RecordingMailer::default());
    let gone = fixture.dir.path().join("deleted.md");

    assert_eq!(
        fixture.pipeline.handle(&FileChanged::now(&gone)),
        Outcome::Skipped(SkipReason::ReadError)
    );
    assert_eq!(fixture.mailer.attempts(), 0);
}

/// Ledger double whose `mark` always fails with a fixed error.
struct MarkFailsLedger {
    duplicate: bool,
}

impl Ledger for MarkFailsLedger {
    fn has(&self, _path: &Path) -> LedgerResult<bool> {
        Ok(false)
    }

    fn mark(&self, path: &Path) -> LedgerResult<()> {
        if self.duplicate {
            Err(LedgerError::DuplicateKey(path.display().to_string()))
        } else {
            Err(LedgerError::Db(DbError::UnsupportedSchemaVersion {
                db_version: 9,
                latest_supported: 1,
            }))
        }
    }

    fn records(&self) -> LedgerResult<Vec<ProcessedRecord>> {
        Ok(Vec::new())
    }
}

#[test]
fn ledger_write_failure_after_send_still_counts_as_delivered() {
    for duplicate in [true, false] {
        let dir = tempfile::tempdir().unwrap();
        let note = dir.path().join("note.md");
        std::fs::write(&note, COMPLETE_NOTE).unwrap();
        let mailer = Arc::new(RecordingMailer::default());
        let pipeline = DeliveryPipeline::new(
            Arc::new(MarkFailsLedger { duplicate }),
            mailer.clone(),
            Arc::new(FileAnnotator),
            RECIPIENT,
        );

        assert_eq!(pipeline.handle(&FileChanged::now(&note)), Outcome::Delivered);
        assert_eq!(mailer.attempts(), 1);

        let content = std::fs::read_to_string(&note).unwrap();
        let appended = content.strip_prefix(COMPLETE_NOTE).unwrap();
        assert!(annotation_pattern("sent OK").is_match(appended));
    }
}

/// Ledger double whose reads always fail.
struct UnreadableLedger;

impl Ledger for UnreadableLedger {
    fn has(&self, _path: &Path) -> LedgerResult<bool> {
        Err(LedgerError::Db(DbError::UnsupportedSchemaVersion {
            db_version: 9,
            latest_supported: 1,
        }))
    }

    fn mark(&self, _path: &Path) -> LedgerResult<()> {
        Ok(())
    }

    fn records(&self) -> LedgerResult<Vec<ProcessedRecord>> {
        Ok(Vec::new())
    }
}

#[test]
fn ledger_read_failure_skips_without_sending() {
    let dir = tempfile::tempdir().unwrap();
    let note = dir.path().join("note.md");
    std::fs::write(&note, COMPLETE_NOTE).unwrap();
    let mailer = Arc::new(RecordingMailer::default());
    let pipeline = DeliveryPipeline::new(
        Arc::new(UnreadableLedger),
        mailer.clone(),
        Arc::new(FileAnnotator),
        RECIPIENT,
    );

    assert_eq!(
        pipeline.handle(&FileChanged::now(&note)),
        Outcome::Skipped(SkipReason::ReadError)
    );
    assert_eq!(mailer.attempts(), 0);
    assert_eq!(std::fs::read_to_string(&note).unwrap(), COMPLETE_NOTE);
}

/// Annotator double that always fails to write.
struct BrokenAnnotator;

impl StatusAnnotator for BrokenAnnotator {
    fn annotate(&self, _path: &Path, _status: DeliveryStatus) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "note is read-only",
        ))
    }
}

#[test]
fn annotation_failure_does_not_change_outcome() {
    let dir = tempfile::tempdir().unwrap();
    let note = dir.path().join("note.md");
    std::fs::write(&note, COMPLETE_NOTE).unwrap();
    let ledger = Arc::new(SqliteLedger::open(dir.path().join("ledger.db")).unwrap());
    let mailer = Arc::new(RecordingMailer::default());
    let pipeline = DeliveryPipeline::new(
        ledger.clone(),
        mailer.clone(),
        Arc::new(BrokenAnnotator),
        RECIPIENT,
    );

    assert_eq!(pipeline.handle(&FileChanged::now(&note)), Outcome::Delivered);
    assert!(ledger.has(&note).unwrap());
    assert_eq!(mailer.attempts(), 1);
}

#[test]
fn zero_debounce_window_lets_rapid_events_through() {
    let fixture = Fixture::new(RecordingMailer::failing(MailError::Transport(
        "connection refused".to_string(),
    )));
    let pipeline = DeliveryPipeline::new(
        fixture.ledger.clone(),
        fixture.mailer.clone(),
        Arc::new(FileAnnotator),
        RECIPIENT,
    )
    .with_debounce_window(Duration::ZERO);
    assert_eq!(pipeline.recipient(), RECIPIENT);

    let note = fixture.write_note("note.md", COMPLETE_NOTE);
    let start = Instant::now();
    for offset_ms in [0, 10] {
        let event = changed_at(&note, start + Duration::from_millis(offset_ms));
        assert!(matches!(
            pipeline.handle(&event),
            Outcome::DeliveryFailed(MailError::Transport(_))
        ));
    }
    assert_eq!(fixture.mailer.attempts(), 2);
}
