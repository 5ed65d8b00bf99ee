use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::plan_repository::PlanRepository,
    models::subscription::{NewPlan, PlanChanges, SubscriptionPlan},
};

const PLAN_COLUMNS: &str =
    "id, title, description, recurrence, price, product_id, price_id, created_at, updated_at";

pub struct PostgresPlanRepository {
    pub pool: PgPool,
}

#[async_trait]
impl PlanRepository for PostgresPlanRepository {
    async fn insert_plan(&self, plan: NewPlan) -> Result<SubscriptionPlan, sqlx::Error> {
        let sql = format!(
            "INSERT INTO subscription_plans (id, title, description, recurrence, price, product_id, price_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PLAN_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionPlan>(&sql)
            .bind(Uuid::new_v4())
            .bind(&plan.title)
            .bind(&plan.description)
            .bind(plan.recurrence)
            .bind(plan.price)
            .bind(&plan.product_id)
            .bind(&plan.price_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_plan_by_id(
        &self,
        plan_id: Uuid,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM subscription_plans WHERE id = $1");
        sqlx::query_as::<_, SubscriptionPlan>(&sql)
            .bind(plan_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, sqlx::Error> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM subscription_plans ORDER BY created_at");
        sqlx::query_as::<_, SubscriptionPlan>(&sql)
            .fetch_all(&self.pool)
            .await
    }

    async fn update_plan(
        &self,
        plan_id: Uuid,
        changes: &PlanChanges,
    ) -> Result<Option<SubscriptionPlan>, sqlx::Error> {
        let sql = format!(
            "UPDATE subscription_plans
             SET title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 recurrence = COALESCE($4, recurrence),
                 price = COALESCE($5, price),
                 price_id = COALESCE($6, price_id),
                 updated_at = now()
             WHERE id = $1
             RETURNING {PLAN_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionPlan>(&sql)
            .bind(plan_id)
            .bind(changes.title.as_deref())
            .bind(changes.description.as_deref())
            .bind(changes.recurrence)
            .bind(changes.price)
            .bind(changes.price_id.as_deref())
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_plan(&self, plan_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM subscription_plans WHERE id = $1")
            .bind(plan_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
