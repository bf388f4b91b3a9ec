//! Core logic for notemail: watch a notes folder, mail complete notes once.
//! This crate owns the delivery pipeline and its idempotence ledger.

pub mod config;
pub mod db;
pub mod http;
pub mod logging;
pub mod mail;
pub mod model;
pub mod parse;
pub mod repo;
pub mod service;
pub mod watch;

pub use config::{Config, ConfigError, SenderCredentials, SmtpSettings};
pub use logging::{default_log_level, init_logging, logging_status, parse_level, LoggingError};
pub use mail::{MailError, Mailer, OutgoingMail, SmtpMailer};
pub use model::note::{MissingPart, ParsedNote};
pub use model::record::ProcessedRecord;
pub use parse::note::{parse_note, NOTE_TEMPLATE};
pub use repo::ledger_repo::{Ledger, LedgerError, LedgerResult, SqliteLedger};
pub use service::annotate::{DeliveryStatus, FileAnnotator, StatusAnnotator};
pub use service::pipeline::{compose_mail, DeliveryPipeline, Outcome, SkipReason};
pub use service::runtime::NoteService;
pub use watch::debounce::DebounceGate;
pub use watch::watcher::{ChangeWatcher, WatchError};
pub use watch::FileChanged;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
