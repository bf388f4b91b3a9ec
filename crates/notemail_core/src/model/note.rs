//! Parsed note model.
//!
//! # Invariants
//! - `is_complete` is true iff the send marker was seen, the sender name is
//!   non-empty and at least one task line exists.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Structured view of one note's tagged markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedNote {
    /// Name from the last `#sender:` declaration, if any.
    pub sender_name: Option<String>,
    /// Non-tag lines in original order, trimmed. Blank lines are kept.
    pub tasks: Vec<String>,
    /// Whether a `#send` line was present.
    pub has_send_marker: bool,
    pub is_complete: bool,
}

/// One unmet requirement that keeps a note from being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPart {
    SendMarker,
    Sender,
    Tasks,
}

impl Display for MissingPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SendMarker => write!(f, "#send tag"),
            Self::Sender => write!(f, "sender name"),
            Self::Tasks => write!(f, "tasks"),
        }
    }
}

impl ParsedNote {
    /// Builds a note and derives `is_complete` from its parts.
    pub fn new(sender_name: Option<String>, tasks: Vec<String>, has_send_marker: bool) -> Self {
        let mut note = Self {
            sender_name,
            tasks,
            has_send_marker,
            is_complete: false,
        };
        note.is_complete = note.missing().is_empty();
        note
    }

    /// Returns the non-empty sender name, if any.
    pub fn sender(&self) -> Option<&str> {
        self.sender_name.as_deref().filter(|name| !name.is_empty())
    }

    /// Lists requirements this note does not yet satisfy, in check order.
    pub fn missing(&self) -> Vec<MissingPart> {
        let mut missing = Vec::new();
        if !self.has_send_marker {
            missing.push(MissingPart::SendMarker);
        }
        if self.sender().is_none() {
            missing.push(MissingPart::Sender);
        }
        if self.tasks.is_empty() {
            missing.push(MissingPart::Tasks);
        }
        missing
    }
}
