//! Delivery status annotations.
//!
//! # Invariants
//! - The default sink appends exactly one status line to the note and never
//!   rewrites existing content.
//! - Annotating a file that no longer exists fails instead of recreating it.

use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};
use std::io::Write;
use std::path::Path;

const STATUS_TIME_FORMAT: &str = "%I:%M %p - %d/%m/%y";

/// Delivery result recorded next to the note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    SentOk,
    SentFailed,
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SentOk => write!(f, "sent OK"),
            Self::SentFailed => write!(f, "sent Failed"),
        }
    }
}

/// Sink for per-note delivery status.
pub trait StatusAnnotator: Send + Sync {
    fn annotate(&self, path: &Path, status: DeliveryStatus) -> std::io::Result<()>;
}

/// Appends the status line to the note file itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileAnnotator;

impl StatusAnnotator for FileAnnotator {
    fn annotate(&self, path: &Path, status: DeliveryStatus) -> std::io::Result<()> {
        let mut file = std::fs::OpenOptions::new().append(true).open(path)?;
        file.write_all(status_line(status, Local::now()).as_bytes())?;
        file.flush()
    }
}

/// Renders `"\nServer Sent Timestamp: {time} : {status}\n"`.
pub fn status_line(status: DeliveryStatus, at: DateTime<Local>) -> String {
    format!(
        "\nServer Sent Timestamp: {} : {}\n",
        at.format(STATUS_TIME_FORMAT),
        status
    )
}
