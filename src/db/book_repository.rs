use async_trait::async_trait;
use uuid::Uuid;

use crate::models::book::{Book, BookChanges};

#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert_book(&self, book: BookChanges) -> Result<Book, sqlx::Error>;
    async fn find_book_by_id(&self, book_id: Uuid) -> Result<Option<Book>, sqlx::Error>;
    async fn list_books(&self) -> Result<Vec<Book>, sqlx::Error>;
    async fn update_book(
        &self,
        book_id: Uuid,
        changes: &BookChanges,
    ) -> Result<Option<Book>, sqlx::Error>;
    async fn delete_book(&self, book_id: Uuid) -> Result<Option<Book>, sqlx::Error>;
}
