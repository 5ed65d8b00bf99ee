use crate::config::AuthSettings;
use crate::db::{
    book_repository::BookRepository, member_repository::MemberRepository,
    user_repository::UserRepository,
};
use crate::services::{
    file_store::FileStore,
    smtp_mailer::Mailer,
    stripe::StripeService,
    subscriptions::{PlanManager, SubscriptionLifecycle},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub books: Arc<dyn BookRepository>,
    pub members: Arc<dyn MemberRepository>,
    pub mailer: Arc<dyn Mailer>,
    pub stripe: Arc<dyn StripeService>,
    pub file_store: Arc<dyn FileStore>,
    pub plan_manager: Arc<PlanManager>,
    pub lifecycle: Arc<SubscriptionLifecycle>,
    pub auth: Arc<AuthSettings>,
}
