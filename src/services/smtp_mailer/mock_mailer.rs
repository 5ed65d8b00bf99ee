use crate::services::smtp_mailer::{welcome_body, MailError, Mailer, WELCOME_SUBJECT};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<RecordedEmail>>,
    pub fail_send: bool,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_welcome_email(&self, to: &str, name: &str) -> Result<(), MailError> {
        self.send_email_generic(to, WELCOME_SUBJECT, &welcome_body(name))
            .await
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        if self.fail_send {
            return Err(MailError::Other("mock failure".into()));
        }
        self.sent.lock().unwrap().push(RecordedEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
