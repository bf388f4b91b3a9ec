//! Per-event delivery pipeline.
//!
//! # Responsibility
//! - Drive one `FileChanged` event through
//!   `Received -> LedgerChecked -> DebounceChecked -> ContentRead -> Parsed ->
//!   (Skipped | Delivering -> Delivered | DeliveryFailed)`.
//! - Own the failure policy: nothing here retries, and no outcome stops the
//!   watcher.
//!
//! # Invariants
//! - A path already in the ledger never reaches the mailer.
//! - The ledger is marked only after the mailer reported success.
//! - A ledger write failure after a successful send is logged, not undone.
//! - Both `Delivered` and `DeliveryFailed` append one status annotation.

use crate::logging::single_line;
use crate::mail::{MailError, Mailer, OutgoingMail};
use crate::model::note::ParsedNote;
use crate::parse::note::parse_note;
use crate::repo::ledger_repo::Ledger;
use crate::service::annotate::{DeliveryStatus, StatusAnnotator};
use crate::watch::debounce::DebounceGate;
use crate::watch::FileChanged;
use chrono::{Local, NaiveDate};
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const MAIL_DATE_FORMAT: &str = "%Y-%m-%d";
const TASK_BULLET: &str = "\u{2022} ";
const BODY_TRAILER: &str = "\n\n\n\n\n\n";
const MAX_LOGGED_ERROR_CHARS: usize = 300;

/// Pipeline state reached by an event; used in log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    LedgerChecked,
    DebounceChecked,
    ContentRead,
    Parsed,
    Delivering,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::LedgerChecked => "ledger_checked",
            Self::DebounceChecked => "debounce_checked",
            Self::ContentRead => "content_read",
            Self::Parsed => "parsed",
            Self::Delivering => "delivering",
        }
    }
}

/// Why an event ended without a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
    Debounced,
    ReadError,
    Incomplete,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyProcessed => write!(f, "already_processed"),
            Self::Debounced => write!(f, "debounced"),
            Self::ReadError => write!(f, "read_error"),
            Self::Incomplete => write!(f, "incomplete"),
        }
    }
}

/// Terminal state of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Skipped(SkipReason),
    Delivered,
    DeliveryFailed(MailError),
}

/// Watcher-driven delivery pipeline. Shared across blocking workers.
pub struct DeliveryPipeline {
    ledger: Arc<dyn Ledger>,
    mailer: Arc<dyn Mailer>,
    annotator: Arc<dyn StatusAnnotator>,
    gate: DebounceGate,
    recipient: String,
}

impl DeliveryPipeline {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        mailer: Arc<dyn Mailer>,
        annotator: Arc<dyn StatusAnnotator>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            mailer,
            annotator,
            gate: DebounceGate::default(),
            recipient: recipient.into(),
        }
    }

    /// Replaces the default one-second debounce window.
    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.gate = DebounceGate::new(window);
        self
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    /// Processes one event to a terminal outcome. Blocking.
    pub fn handle(&self, event: &FileChanged) -> Outcome {
        let path = event.path.as_path();
        trace_stage(path, Stage::Received);

        match self.ledger.has(path) {
            Ok(true) => return skip(path, Stage::LedgerChecked, SkipReason::AlreadyProcessed),
            Ok(false) => trace_stage(path, Stage::LedgerChecked),
            Err(err) => {
                error!(
                    "event=pipeline module=service status=error stage={} path={} error_code=ledger_read_failed error={}",
                    Stage::LedgerChecked.as_str(),
                    path.display(),
                    err
                );
                return Outcome::Skipped(SkipReason::ReadError);
            }
        }

        if !self.gate.should_process(path, event.timestamp) {
            return skip(path, Stage::DebounceChecked, SkipReason::Debounced);
        }
        trace_stage(path, Stage::DebounceChecked);

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "event=pipeline module=service status=skip stage={} path={} reason={} error={}",
                    Stage::ContentRead.as_str(),
                    path.display(),
                    SkipReason::ReadError,
                    err
                );
                return Outcome::Skipped(SkipReason::ReadError);
            }
        };
        trace_stage(path, Stage::ContentRead);

        let note = parse_note(&content);
        let Some(mail) = compose_mail(&note, Local::now().date_naive(), &self.recipient) else {
            let missing = note
                .missing()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            info!(
                "event=pipeline module=service status=skip stage={} path={} reason={} missing={}",
                Stage::Parsed.as_str(),
                path.display(),
                SkipReason::Incomplete,
                missing
            );
            return Outcome::Skipped(SkipReason::Incomplete);
        };
        trace_stage(path, Stage::Parsed);

        info!(
            "event=pipeline module=service status=start stage={} path={} tasks={}",
            Stage::Delivering.as_str(),
            path.display(),
            note.tasks.len()
        );
        match self.mailer.send(&mail) {
            Ok(()) => {
                self.record_delivery(path);
                self.annotate(path, DeliveryStatus::SentOk);
                info!(
                    "event=pipeline module=service status=ok outcome=delivered path={}",
                    path.display()
                );
                Outcome::Delivered
            }
            Err(err) => {
                self.annotate(path, DeliveryStatus::SentFailed);
                error!(
                    "event=pipeline module=service status=error outcome=delivery_failed path={} error={}",
                    path.display(),
                    single_line(&err.to_string(), MAX_LOGGED_ERROR_CHARS)
                );
                Outcome::DeliveryFailed(err)
            }
        }
    }

    fn record_delivery(&self, path: &Path) {
        match self.ledger.mark(path) {
            Ok(()) => {}
            Err(err) if err.is_duplicate() => {
                info!(
                    "event=ledger_mark module=service status=ok path={} detail=already_recorded",
                    path.display()
                );
            }
            Err(err) => {
                error!(
                    "event=ledger_mark module=service status=error path={} error_code=ledger_write_failed error={}",
                    path.display(),
                    err
                );
            }
        }
    }

    fn annotate(&self, path: &Path, status: DeliveryStatus) {
        if let Err(err) = self.annotator.annotate(path, status) {
            warn!(
                "event=annotate module=service status=error path={} delivery_status={} error={}",
                path.display(),
                status,
                err
            );
        }
    }
}

/// Builds the outgoing mail for a complete note; `None` when incomplete.
///
/// Subject is `"{sender}- {date}"`; body is `"{sender} - {date}:\n\n"`, one
/// bullet line per task, then blank trailing lines.
pub fn compose_mail(note: &ParsedNote, date: NaiveDate, recipient: &str) -> Option<OutgoingMail> {
    if !note.is_complete {
        return None;
    }
    let sender = note.sender()?;
    let date = date.format(MAIL_DATE_FORMAT);
    let bullets = note
        .tasks
        .iter()
        .map(|task| format!("{TASK_BULLET}{task}"))
        .collect::<Vec<_>>()
        .join("\n");

    Some(OutgoingMail::new(
        format!("{sender}- {date}"),
        recipient,
        format!("{sender} - {date}:\n\n{bullets}{BODY_TRAILER}"),
    ))
}

fn trace_stage(path: &Path, stage: Stage) {
    debug!(
        "event=pipeline module=service status=ok stage={} path={}",
        stage.as_str(),
        path.display()
    );
}

fn skip(path: &Path, stage: Stage, reason: SkipReason) -> Outcome {
    info!(
        "event=pipeline module=service status=skip stage={} path={} reason={}",
        stage.as_str(),
        path.display(),
        reason
    );
    Outcome::Skipped(reason)
}
