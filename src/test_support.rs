//! Fixtures shared by unit and router tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    config::AuthSettings,
    db::mock_db::MockDb,
    models::{
        subscription::{RecurrenceKind, SubscriptionPlan},
        user::{User, UserRole},
    },
    services::{
        file_store::LocalFileStore,
        smtp_mailer::MockMailer,
        stripe::MockStripeService,
        subscriptions::{CheckoutUrls, PlanManager, SubscriptionLifecycle},
    },
    routes::auth::login::claims_for,
    state::AppState,
    utils::jwt::{create_jwt, JwtKeys},
};

pub const TEST_JWT_SECRET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEF";

pub fn user_fixture(role: UserRole) -> User {
    let now = OffsetDateTime::now_utc();
    let id = Uuid::new_v4();
    User {
        id,
        name: format!("{:?} user", role),
        email: format!("{}@example.com", id.simple()),
        password_hash: String::new(),
        token: None,
        is_superuser: role == UserRole::SuperUser,
        role,
        stripe_customer_id: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn plan_fixture(recurrence: RecurrenceKind) -> SubscriptionPlan {
    let now = OffsetDateTime::now_utc();
    SubscriptionPlan {
        id: Uuid::new_v4(),
        title: "Gold".into(),
        description: "Unlimited borrowing".into(),
        recurrence,
        price: 9.99,
        product_id: "prod_fixture".into(),
        price_id: "price_fixture".into(),
        created_at: now,
        updated_at: now,
    }
}

pub fn checkout_urls() -> CheckoutUrls {
    CheckoutUrls {
        success_url: "http://localhost:3000/subscription/success".into(),
        cancel_url: "http://localhost:3000/subscription/cancel".into(),
    }
}

pub fn auth_settings() -> AuthSettings {
    AuthSettings {
        keys: JwtKeys::from_secret(TEST_JWT_SECRET).expect("test secret is valid"),
        issuer: "library-management-system".into(),
        audience: "library-clients".into(),
        token_ttl: Duration::from_secs(3600),
    }
}

/// Application state wired entirely to in-memory doubles. Uploads land in
/// `upload_dir`.
pub fn test_state(
    db: Arc<MockDb>,
    stripe: MockStripeService,
    mailer: Arc<MockMailer>,
    upload_dir: &Path,
) -> AppState {
    let stripe = Arc::new(stripe);
    let plan_manager = Arc::new(PlanManager::new(db.clone(), stripe.clone(), "usd"));
    let lifecycle = Arc::new(SubscriptionLifecycle::new(
        db.clone(),
        db.clone(),
        db.clone(),
        stripe.clone(),
        checkout_urls(),
    ));
    AppState {
        users: db.clone(),
        books: db.clone(),
        members: db.clone(),
        mailer,
        stripe,
        file_store: Arc::new(LocalFileStore::new(upload_dir)),
        plan_manager,
        lifecycle,
        auth: Arc::new(auth_settings()),
    }
}

/// Seeds a user of `role` holding a freshly issued token and returns both.
pub fn signed_in(db: &MockDb, state: &AppState, role: UserRole) -> (User, String) {
    let mut user = user_fixture(role);
    let auth = &state.auth;
    let token = create_jwt(claims_for(&user, auth), &auth.keys, &auth.issuer, &auth.audience)
        .expect("token encodes");
    user.token = Some(token.clone());
    db.seed_user(user.clone());
    (user, token)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
