use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::{
    NewInstance, StatusUpdate, SubscriptionInstance, SubscriptionStatus,
};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Inserts a fresh instance in the Pending/Open state.
    async fn insert_instance(
        &self,
        instance: NewInstance,
    ) -> Result<SubscriptionInstance, sqlx::Error>;
    async fn find_instance_by_id(
        &self,
        instance_id: Uuid,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error>;
    async fn find_instance_by_stripe_sub_id(
        &self,
        stripe_sub_id: &str,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error>;
    /// Writes only the customer id and checkout link columns.
    async fn attach_checkout(
        &self,
        instance_id: Uuid,
        customer_id: &str,
        payment_link: &str,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error>;
    /// Conditional update: applies `update` only while the stored status is one
    /// of `expected`. Returns `None` when the guard did not match.
    async fn apply_transition(
        &self,
        instance_id: Uuid,
        expected: &[SubscriptionStatus],
        update: &StatusUpdate,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error>;
}
