use async_trait::async_trait;
use lettre::address::AddressError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid Address: {0}")]
    InvalidEmailAddress(String),
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Config error: {0}")]
    Config(String),
    #[error("Error: {0}")]
    Other(String),
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

pub const WELCOME_SUBJECT: &str = "Welcome to Our Library";

pub fn welcome_body(name: &str) -> String {
    format!(
        "Hello {},\n\nYour library administrator account is ready. \
         You can now sign in and start managing books, members and subscription plans.\n\n\
         Happy reading!",
        name
    )
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome_email(&self, to: &str, name: &str) -> Result<(), MailError>;
    async fn send_email_generic(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError>;
}

#[cfg(test)]
mod mock_mailer;
mod smtp_impl;

#[cfg(test)]
pub use mock_mailer::MockMailer;
pub use smtp_impl::SmtpMailer;
