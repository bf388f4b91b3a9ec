//! Outbound mail collaborator.
//!
//! # Responsibility
//! - Define the `Mailer` contract used by the pipeline and the HTTP surface.
//! - Classify failures into authentication, transport and address errors.
//!
//! # Invariants
//! - `send` is blocking and bounded by the transport timeout.
//! - Implementations hold no shared lock while talking to the server.

mod smtp;

pub use smtp::SmtpMailer;

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One plain-text message to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub recipient: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn new(
        subject: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            recipient: recipient.into(),
            body: body.into(),
        }
    }
}

/// Delivery failure reported by a `Mailer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MailError {
    /// The server rejected the sender credentials.
    Authentication(String),
    /// Connection, TLS, protocol or server-side failure.
    Transport(String),
    /// Sender or recipient is not a valid mailbox.
    InvalidAddress(String),
}

impl Display for MailError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication(message) => write!(f, "authentication failed: {message}"),
            Self::Transport(message) => write!(f, "mail transport error: {message}"),
            Self::InvalidAddress(message) => write!(f, "invalid address: {message}"),
        }
    }
}

impl Error for MailError {}

/// Sends one message; blocking.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}
