use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::user::UserRole;

/// Library members come in two flavours sharing one profile shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Student,
    Manager,
}

impl MemberKind {
    pub fn table(&self) -> &'static str {
        match self {
            MemberKind::Student => "students",
            MemberKind::Manager => "managers",
        }
    }

    pub fn role(&self) -> UserRole {
        match self {
            MemberKind::Student => UserRole::Student,
            MemberKind::Manager => UserRole::Manager,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MemberKind::Student => "Student",
            MemberKind::Manager => "Manager",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub id: Uuid,
    pub system_user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(alias = "student_id", alias = "manager_id")]
    pub member_code: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewMember {
    pub system_user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub member_code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemberRegister {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(alias = "student_id", alias = "manager_id")]
    pub member_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct MemberChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "student_id", alias = "manager_id")]
    pub member_code: Option<String>,
}

impl MemberChanges {
    /// Drops blank strings so a PATCH never wipes a column.
    pub fn without_blanks(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.trim().is_empty())
        }
        Self {
            first_name: keep(self.first_name),
            last_name: keep(self.last_name),
            email: keep(self.email),
            member_code: keep(self.member_code),
        }
    }
}
