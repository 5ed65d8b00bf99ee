use async_trait::async_trait;
use uuid::Uuid;

use crate::models::member::{Member, MemberChanges, MemberKind, NewMember};

/// Student and manager profiles live in separate tables with the same shape.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn insert_member(&self, kind: MemberKind, member: NewMember)
        -> Result<Member, sqlx::Error>;
    async fn list_members(&self, kind: MemberKind) -> Result<Vec<Member>, sqlx::Error>;
    async fn find_member_by_id(
        &self,
        kind: MemberKind,
        member_id: Uuid,
    ) -> Result<Option<Member>, sqlx::Error>;
    async fn update_member(
        &self,
        kind: MemberKind,
        member_id: Uuid,
        changes: &MemberChanges,
    ) -> Result<Option<Member>, sqlx::Error>;
    async fn delete_member(&self, kind: MemberKind, member_id: Uuid) -> Result<bool, sqlx::Error>;
}
