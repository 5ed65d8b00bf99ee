use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::subscription_repository::SubscriptionRepository,
    models::subscription::{NewInstance, StatusUpdate, SubscriptionInstance, SubscriptionStatus},
};

const INSTANCE_COLUMNS: &str = "id, system_user_id, plan_id, customer_id, price_id, stripe_sub_id, \
                                payment_link, payment_status, status, created_at, updated_at";

pub struct PostgresSubscriptionRepository {
    pub pool: PgPool,
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert_instance(
        &self,
        instance: NewInstance,
    ) -> Result<SubscriptionInstance, sqlx::Error> {
        let sql = format!(
            "INSERT INTO student_subscriptions (id, system_user_id, plan_id, price_id, payment_status, status)
             VALUES ($1, $2, $3, $4, 'open', 'pending')
             RETURNING {INSTANCE_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionInstance>(&sql)
            .bind(Uuid::new_v4())
            .bind(instance.system_user_id)
            .bind(instance.plan_id)
            .bind(&instance.price_id)
            .fetch_one(&self.pool)
            .await
    }

    async fn find_instance_by_id(
        &self,
        instance_id: Uuid,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        let sql = format!("SELECT {INSTANCE_COLUMNS} FROM student_subscriptions WHERE id = $1");
        sqlx::query_as::<_, SubscriptionInstance>(&sql)
            .bind(instance_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_instance_by_stripe_sub_id(
        &self,
        stripe_sub_id: &str,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM student_subscriptions
             WHERE stripe_sub_id = $1
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, SubscriptionInstance>(&sql)
            .bind(stripe_sub_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn attach_checkout(
        &self,
        instance_id: Uuid,
        customer_id: &str,
        payment_link: &str,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        let sql = format!(
            "UPDATE student_subscriptions
             SET customer_id = $2, payment_link = $3, updated_at = now()
             WHERE id = $1
             RETURNING {INSTANCE_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionInstance>(&sql)
            .bind(instance_id)
            .bind(customer_id)
            .bind(payment_link)
            .fetch_optional(&self.pool)
            .await
    }

    async fn apply_transition(
        &self,
        instance_id: Uuid,
        expected: &[SubscriptionStatus],
        update: &StatusUpdate,
    ) -> Result<Option<SubscriptionInstance>, sqlx::Error> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            "UPDATE student_subscriptions
             SET payment_status = $3,
                 status = $4,
                 stripe_sub_id = COALESCE($5, stripe_sub_id),
                 updated_at = now()
             WHERE id = $1 AND status::text = ANY($2)
             RETURNING {INSTANCE_COLUMNS}"
        );
        sqlx::query_as::<_, SubscriptionInstance>(&sql)
            .bind(instance_id)
            .bind(expected)
            .bind(update.payment_status)
            .bind(update.status)
            .bind(update.stripe_sub_id.as_deref())
            .fetch_optional(&self.pool)
            .await
    }
}
