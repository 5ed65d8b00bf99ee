use async_trait::async_trait;
use uuid::Uuid;

use crate::models::subscription::{NewPlan, PlanChanges, SubscriptionPlan};

#[async_trait]
pub trait PlanRepository: Send + Sync {
    async fn insert_plan(&self, plan: NewPlan) -> Result<SubscriptionPlan, sqlx::Error>;
    async fn find_plan_by_id(&self, plan_id: Uuid)
        -> Result<Option<SubscriptionPlan>, sqlx::Error>;
    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, sqlx::Error>;
    /// Partial update; only the columns set in `changes` are written.
    async fn update_plan(
        &self,
        plan_id: Uuid,
        changes: &PlanChanges,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error>;
    async fn delete_plan(&self, plan_id: Uuid) -> Result<bool, sqlx::Error>;
}
