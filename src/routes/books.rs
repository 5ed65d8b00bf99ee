use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::auth::session::AuthSession;
use crate::{
    errors::AppError,
    models::book::{Book, BookChanges},
    responses::JsonResponse,
    services::file_store::FileKind,
    state::AppState,
};

struct Upload {
    kind: FileKind,
    file_name: String,
    bytes: Bytes,
}

/// A parsed multipart book form. Text fields are kept exactly as sent;
/// each handler decides how missing or empty values are treated.
#[derive(Default)]
struct BookForm {
    title: Option<String>,
    author: Option<String>,
    publisher: Option<String>,
    publish_date: Option<String>,
    isbn: Option<String>,
    tags: Vec<String>,
    uploads: Vec<Upload>,
}

impl BookForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let bad = |e: axum::extract::multipart::MultipartError| {
            AppError::Validation(format!("Invalid multipart body: {}", e))
        };
        let mut form = BookForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad)? {
            let name = field.name().unwrap_or_default().to_ascii_lowercase();
            let kind = match name.as_str() {
                "coverimage" | "cover_image" => Some(FileKind::CoverImage),
                "bookpdf" | "book_pdf" => Some(FileKind::BookPdf),
                _ => None,
            };

            if let Some(kind) = kind {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad)?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                if !kind.accepts(&file_name) {
                    return Err(AppError::Validation(format!(
                        "Invalid file format for {}. Allowed: {}",
                        field_label(kind),
                        kind.allowed_extensions().join(", ")
                    )));
                }
                form.uploads.push(Upload {
                    kind,
                    file_name,
                    bytes,
                });
                continue;
            }

            let value = field.text().await.map_err(bad)?;
            match name.as_str() {
                "title" => form.title = Some(value),
                "author" => form.author = Some(value),
                "publisher" => form.publisher = Some(value),
                "publishdate" | "publish_date" => form.publish_date = Some(value),
                "isbn" => form.isbn = Some(value),
                "tags" | "tags[]" => {
                    let tag = value.trim();
                    if !tag.is_empty() {
                        form.tags.push(tag.to_string());
                    }
                }
                other => warn!(field = %other, "ignoring unknown book form field"),
            }
        }
        Ok(form)
    }

    /// Every text column is replaced; absent fields become empty.
    fn replacing(&self) -> BookChanges {
        let full = |v: &Option<String>| Some(v.clone().unwrap_or_default());
        BookChanges {
            title: full(&self.title),
            author: full(&self.author),
            publisher: full(&self.publisher),
            publish_date: full(&self.publish_date),
            isbn: full(&self.isbn),
            tags: Some(self.tags.clone()),
            cover_image: None,
            book_pdf: None,
        }
    }

    /// Only non-empty fields are carried over.
    fn patching(&self) -> BookChanges {
        let keep = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        BookChanges {
            title: keep(&self.title),
            author: keep(&self.author),
            publisher: keep(&self.publisher),
            publish_date: keep(&self.publish_date),
            isbn: keep(&self.isbn),
            tags: (!self.tags.is_empty()).then(|| self.tags.clone()),
            cover_image: None,
            book_pdf: None,
        }
    }
}

fn field_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::CoverImage => "CoverImage",
        FileKind::BookPdf => "BookPDF",
    }
}

/// Writes the uploads and records their paths on `changes`. Returns the new
/// paths so they can be cleaned up if the database write fails.
async fn store_uploads(
    app_state: &AppState,
    uploads: &[Upload],
    changes: &mut BookChanges,
) -> Result<Vec<String>, AppError> {
    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let path = match app_state
            .file_store
            .save(upload.kind, &upload.file_name, &upload.bytes)
            .await
        {
            Ok(path) => path,
            Err(err) => {
                discard_files(app_state, &stored).await;
                return Err(err.into());
            }
        };
        match upload.kind {
            FileKind::CoverImage => changes.cover_image = Some(path.clone()),
            FileKind::BookPdf => changes.book_pdf = Some(path.clone()),
        }
        stored.push(path);
    }
    Ok(stored)
}

async fn discard_files(app_state: &AppState, paths: &[String]) {
    for path in paths {
        if let Err(err) = app_state.file_store.remove(path).await {
            warn!(%path, ?err, "failed to remove stored file");
        }
    }
}

/// Old files that a successful update replaced.
fn superseded(before: &Book, changes: &BookChanges) -> Vec<String> {
    let mut old = Vec::new();
    if changes.cover_image.is_some() {
        old.extend(before.cover_image.clone());
    }
    if changes.book_pdf.is_some() {
        old.extend(before.book_pdf.clone());
    }
    old
}

pub async fn create_book(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let form = BookForm::read(multipart).await?;
    if form.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
        return Err(AppError::Validation("Title is required".into()));
    }

    let mut changes = form.replacing();
    let stored = store_uploads(&app_state, &form.uploads, &mut changes).await?;

    match app_state.books.insert_book(changes).await {
        Ok(book) => {
            info!(book_id = %book.id, "book created");
            Ok((StatusCode::CREATED, Json(book)))
        }
        Err(err) => {
            discard_files(&app_state, &stored).await;
            Err(err.into())
        }
    }
}

pub async fn list_books(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(app_state.books.list_books().await?))
}

pub async fn get_book(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
    Path(book_id): Path<Uuid>,
) -> Result<Json<Book>, AppError> {
    app_state
        .books
        .find_book_by_id(book_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Book not found".into()))
}

async fn apply_form(
    app_state: &AppState,
    book_id: Uuid,
    form: BookForm,
    mut changes: BookChanges,
) -> Result<Book, AppError> {
    let before = app_state
        .books
        .find_book_by_id(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".into()))?;

    let stored = store_uploads(app_state, &form.uploads, &mut changes).await?;
    let updated = match app_state.books.update_book(book_id, &changes).await {
        Ok(Some(book)) => book,
        Ok(None) => {
            discard_files(app_state, &stored).await;
            return Err(AppError::NotFound("Book not found".into()));
        }
        Err(err) => {
            discard_files(app_state, &stored).await;
            return Err(err.into());
        }
    };

    discard_files(app_state, &superseded(&before, &changes)).await;
    info!(%book_id, "book updated");
    Ok(updated)
}

pub async fn replace_book(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
    Path(book_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Book>, AppError> {
    let form = BookForm::read(multipart).await?;
    let changes = form.replacing();
    Ok(Json(apply_form(&app_state, book_id, form, changes).await?))
}

pub async fn patch_book(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
    Path(book_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Book>, AppError> {
    let form = BookForm::read(multipart).await?;
    let changes = form.patching();
    Ok(Json(apply_form(&app_state, book_id, form, changes).await?))
}

pub async fn delete_book(
    State(app_state): State<AppState>,
    AuthSession(_user): AuthSession,
    Path(book_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let book = app_state
        .books
        .delete_book(book_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Book not found".into()))?;

    let files: Vec<String> = book
        .cover_image
        .iter()
        .chain(book.book_pdf.iter())
        .cloned()
        .collect();
    discard_files(&app_state, &files).await;

    info!(%book_id, "book deleted");
    Ok(JsonResponse::success("Book deleted"))
}
