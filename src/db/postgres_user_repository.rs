use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::user_repository::UserRepository,
    models::user::{NewUser, User},
};

const USER_COLUMNS: &str = "id, name, email, password_hash, token, is_superuser, role, \
                            stripe_customer_id, created_at, updated_at";

pub struct PostgresUserRepository {
    pub pool: PgPool,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM system_users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM system_users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, sqlx::Error> {
        let sql = format!(
            "INSERT INTO system_users (id, name, email, password_hash, is_superuser, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.name)
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .bind(new_user.is_superuser)
            .bind(new_user.role)
            .fetch_one(&self.pool)
            .await
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM system_users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_token(&self, user_id: Uuid, token: Option<&str>) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE system_users SET token = $2, updated_at = now() WHERE id = $1")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_stripe_customer_id(
        &self,
        user_id: Uuid,
        customer_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE system_users SET stripe_customer_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(user_id)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
