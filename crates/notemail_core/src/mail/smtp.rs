//! SMTP mailer over STARTTLS with authenticated submission.

use super::{MailError, Mailer, OutgoingMail};
use crate::config::{SenderCredentials, SmtpSettings};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info};
use std::time::Instant;

/// Reply codes meaning the server refused the credentials.
const AUTH_REJECTED_CODES: &[&str] = &["530", "534", "535"];

/// Blocking SMTP client. Opens one connection per message.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds a mailer that authenticates as `sender` against `settings.host`.
    ///
    /// No connection is made until the first `send`.
    pub fn new(settings: &SmtpSettings, sender: &SenderCredentials) -> Result<Self, MailError> {
        let from = parse_mailbox(&sender.address)?;
        let transport = SmtpTransport::starttls_relay(&settings.host)
            .map_err(|err| MailError::Transport(err.to_string()))?
            .port(settings.port)
            .credentials(Credentials::new(
                sender.address.clone(),
                sender.password().to_string(),
            ))
            .timeout(Some(settings.timeout))
            .build();

        Ok(Self { transport, from })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let started_at = Instant::now();
        let message = build_message(&self.from, mail)?;

        match self.transport.send(&message) {
            Ok(_) => {
                info!(
                    "event=mail_send module=mail status=ok recipient={} duration_ms={}",
                    mail.recipient,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                let classified = classify_error(&err);
                error!(
                    "event=mail_send module=mail status=error recipient={} duration_ms={} error={}",
                    mail.recipient,
                    started_at.elapsed().as_millis(),
                    classified
                );
                Err(classified)
            }
        }
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address
        .parse::<Mailbox>()
        .map_err(|err| MailError::InvalidAddress(format!("`{address}`: {err}")))
}

fn build_message(from: &Mailbox, mail: &OutgoingMail) -> Result<Message, MailError> {
    let to = parse_mailbox(&mail.recipient)?;
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_PLAIN)
        .body(mail.body.clone())
        .map_err(|err| MailError::Transport(err.to_string()))
}

fn classify_error(err: &lettre::transport::smtp::Error) -> MailError {
    let auth_rejected = err
        .status()
        .map(|code| AUTH_REJECTED_CODES.contains(&code.to_string().as_str()))
        .unwrap_or(false);
    if auth_rejected {
        MailError::Authentication(err.to_string())
    } else {
        MailError::Transport(err.to_string())
    }
}
