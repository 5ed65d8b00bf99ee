use async_trait::async_trait;
use uuid::Uuid;

use crate::models::user::{NewUser, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error>;
    async fn create_user(&self, new_user: NewUser) -> Result<User, sqlx::Error>;
    async fn delete_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error>;
    /// Stores the bearer token issued at login, or clears it on logout.
    async fn set_token(&self, user_id: Uuid, token: Option<&str>) -> Result<(), sqlx::Error>;
    async fn set_stripe_customer_id(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error>;
}
