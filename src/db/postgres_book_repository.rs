use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    db::book_repository::BookRepository,
    models::book::{Book, BookChanges},
};

const BOOK_COLUMNS: &str = "id, title, author, publisher, publish_date, isbn, cover_image, \
                            book_pdf, tags, created_at, updated_at";

pub struct PostgresBookRepository {
    pub pool: PgPool,
}

#[async_trait]
impl BookRepository for PostgresBookRepository {
    async fn insert_book(&self, book: BookChanges) -> Result<Book, sqlx::Error> {
        let sql = format!(
            "INSERT INTO books (id, title, author, publisher, publish_date, isbn, cover_image, book_pdf, tags)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {BOOK_COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&sql)
            .bind(Uuid::new_v4())
            .bind(book.title.unwrap_or_default())
            .bind(book.author.unwrap_or_default())
            .bind(book.publisher.unwrap_or_default())
            .bind(book.publish_date.unwrap_or_default())
            .bind(book.isbn.unwrap_or_default())
            .bind(book.cover_image)
            .bind(book.book_pdf)
            .bind(book.tags.unwrap_or_default())
            .fetch_one(&self.pool)
            .await
    }

    async fn find_book_by_id(&self, book_id: Uuid) -> Result<Option<Book>, sqlx::Error> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = $1");
        sqlx::query_as::<_, Book>(&sql)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_books(&self) -> Result<Vec<Book>, sqlx::Error> {
        let sql = format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at");
        sqlx::query_as::<_, Book>(&sql).fetch_all(&self.pool).await
    }

    async fn update_book(
        &self,
        book_id: Uuid,
        changes: &BookChanges,
    ) -> Result<Option<Book>, sqlx::Error> {
        let sql = format!(
            "UPDATE books
             SET title = COALESCE($2, title),
                 author = COALESCE($3, author),
                 publisher = COALESCE($4, publisher),
                 publish_date = COALESCE($5, publish_date),
                 isbn = COALESCE($6, isbn),
                 tags = COALESCE($7, tags),
                 cover_image = COALESCE($8, cover_image),
                 book_pdf = COALESCE($9, book_pdf),
                 updated_at = now()
             WHERE id = $1
             RETURNING {BOOK_COLUMNS}"
        );
        sqlx::query_as::<_, Book>(&sql)
            .bind(book_id)
            .bind(changes.title.as_deref())
            .bind(changes.author.as_deref())
            .bind(changes.publisher.as_deref())
            .bind(changes.publish_date.as_deref())
            .bind(changes.isbn.as_deref())
            .bind(changes.tags.as_ref())
            .bind(changes.cover_image.as_deref())
            .bind(changes.book_pdf.as_deref())
            .fetch_optional(&self.pool)
            .await
    }

    async fn delete_book(&self, book_id: Uuid) -> Result<Option<Book>, sqlx::Error> {
        let sql = format!("DELETE FROM books WHERE id = $1 RETURNING {BOOK_COLUMNS}");
        sqlx::query_as::<_, Book>(&sql)
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await
    }
}
