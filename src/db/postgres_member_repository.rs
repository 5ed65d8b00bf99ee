use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::member_repository::MemberRepository,
    models::member::{Member, MemberChanges, MemberKind, NewMember},
};

const MEMBER_COLUMNS: &str =
    "id, system_user_id, first_name, last_name, email, member_code, created_at, updated_at";

pub struct PostgresMemberRepository {
    pub pool: PgPool,
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn insert_member(
        &self,
        kind: MemberKind,
        member: NewMember,
    ) -> Result<Member, sqlx::Error> {
        let sql = format!(
            "INSERT INTO {} (id, system_user_id, first_name, last_name, email, member_code)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {MEMBER_COLUMNS}",
            kind.table()
        );
        sqlx::query_as::<_, Member>(&sql)
            .bind(Uuid::new_v4())
            .bind(member.system_user_id)
            .bind(&member.first_name)
            .bind(&member.last_name)
            .bind(&member.email)
            .bind(&member.member_code)
            .fetch_one(&self.pool)
            .await
    }

    async fn list_members(&self, kind: MemberKind) -> Result<Vec<Member>, sqlx::Error> {
        let sql = format!(
            "SELECT {MEMBER_COLUMNS} FROM {} ORDER BY created_at",
            kind.table()
        );
        sqlx::query_as::<_, Member>(&sql).fetch_all(&self.pool).await
    }

    async fn find_member_by_id(
        &self,
        kind: MemberKind,
        member_id: Uuid,
    ) -> Result<Option<Member>, sqlx::Error> {
        let sql = format!("SELECT {MEMBER_COLUMNS} FROM {} WHERE id = $1", kind.table());
        sqlx::query_as::<_, Member>(&sql)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn update_member(
        &self,
        kind: MemberKind,
        member_id: Uuid,
        changes: &MemberChanges,
    ) -> Result<Option<Member>, sqlx::Error> {
        let sql = format!(
            "UPDATE {}
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 email = COALESCE($4, email),
                 member_code = COALESCE($5, member_code),
                 updated_at = now()
             WHERE id = $1
             RETURNING {MEMBER_COLUMNS}",
            kind.table()
        );
        sqlx::query_as::<_, Member>(&sql)
            .bind(member_id)
            .bind(changes.first_name.as_deref())
            .bind(changes.last_name.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.member_code.as_deref())
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_member(&self, kind: MemberKind, member_id: Uuid) -> Result<bool, sqlx::Error> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        let result = sqlx::query(&sql)
            .bind(member_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
