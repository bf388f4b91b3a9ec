#![allow(dead_code)]

use notemail_core::{MailError, Mailer, OutgoingMail};
use std::sync::Mutex;

/// Mailer double that records every message and can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingMail>>,
    failure: Mutex<Option<MailError>>,
}

impl RecordingMailer {
    pub fn failing(err: MailError) -> Self {
        let mailer = Self::default();
        mailer.fail_with(Some(err));
        mailer
    }

    pub fn fail_with(&self, err: Option<MailError>) {
        *self.failure.lock().unwrap() = err;
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }
}

impl Mailer for RecordingMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(mail.clone());
        match self.failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub const COMPLETE_NOTE: &str = "#sender: Alice\n- buy milk\n- call Bob\n#send";
