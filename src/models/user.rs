use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    SuperUser,
    Manager,
    Student,
}

impl UserRole {
    /// Roles allowed to create, edit and delete subscription plans.
    pub fn can_manage_plans(self) -> bool {
        matches!(self, UserRole::SuperUser | UserRole::Manager)
    }
}

#[derive(Debug, FromRow, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(skip_serializing, default)]
    pub token: Option<String>,
    pub is_superuser: bool,
    pub role: UserRole,
    pub stripe_customer_id: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_superuser: bool,
    pub role: UserRole,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterPayload {
    pub name: String,
    pub email: String,
    pub password: String,
}
