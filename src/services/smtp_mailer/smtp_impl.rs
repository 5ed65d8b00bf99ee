use async_trait::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use super::{welcome_body, MailError, Mailer, WELCOME_SUBJECT};
use crate::config::SmtpSettings;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    sender: Mailbox,
}

impl SmtpMailer {
    pub fn from_settings(settings: &SmtpSettings) -> Result<Self, MailError> {
        let sender: Mailbox = settings.from.parse()?;
        let transport = build_transport(settings)?;
        Ok(Self {
            transport: Arc::new(transport),
            sender,
        })
    }

    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let recipient: Mailbox = to.parse()?;
        let email = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(subject)
            .body(body.to_string())?;

        self.transport
            .send(email)
            .await
            .map(|_| ())
            .map_err(|e| e.into())
    }
}

fn build_transport(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let mut builder = if settings.tls_disabled {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host).port(settings.port)
    } else {
        let tls = TlsParameters::new(settings.host.clone())?;
        AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
            .port(settings.port)
            .tls(Tls::Required(tls))
    };

    if let (Some(username), Some(password)) =
        (settings.username.as_ref(), settings.password.as_ref())
    {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_welcome_email(&self, to: &str, name: &str) -> Result<(), MailError> {
        self.send_email(to, WELCOME_SUBJECT, &welcome_body(name))
            .await
    }

    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        self.send_email(to, subject, body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_settings() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            from: "library@example.com".to_string(),
            tls_disabled: false,
        }
    }

    #[tokio::test]
    async fn builds_tls_transport() {
        assert!(SmtpMailer::from_settings(&base_settings()).is_ok());
    }

    #[tokio::test]
    async fn builds_plaintext_transport_when_tls_disabled() {
        let mut settings = base_settings();
        settings.tls_disabled = true;
        settings.port = 1025;
        settings.username = None;
        settings.password = None;
        assert!(SmtpMailer::from_settings(&settings).is_ok());
    }

    #[tokio::test]
    async fn rejects_invalid_sender() {
        let mut settings = base_settings();
        settings.from = "not an address".into();
        assert!(matches!(
            SmtpMailer::from_settings(&settings),
            Err(MailError::InvalidEmailAddress(_))
        ));
    }
}
