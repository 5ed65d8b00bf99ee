pub mod file_store;
pub mod smtp_mailer;
pub mod stripe;
pub mod subscriptions;
