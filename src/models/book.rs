use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub publish_date: String,
    pub isbn: String,
    pub cover_image: Option<String>,
    pub book_pdf: Option<String>,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Text fields and stored file paths collected from a multipart book form.
/// Every `Some` replaces the stored column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookChanges {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub publish_date: Option<String>,
    pub isbn: Option<String>,
    pub tags: Option<Vec<String>>,
    pub cover_image: Option<String>,
    pub book_pdf: Option<String>,
}
