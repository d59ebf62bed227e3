//! Book CRUD handlers.
//!
//! Handlers go through the coordinator only; caching and event publishing
//! happen behind it.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use booksync_core::book::{Book, BookId, CreateBookRequest, UpdateBookRequest};
use booksync_core::storage::RepositoryError;

use crate::{handlers::AppError, state::AppState};

/// Error response with message (for malformed request bodies).
fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, String) {
    let msg = message.into();
    tracing::warn!(status = %status, message = %msg, "API error");
    (status, msg)
}

fn not_found(id: BookId) -> AppError {
    AppError::from(RepositoryError::NotFound {
        entity_type: "Book",
        id: id.to_string(),
    })
}

/// List all books (GET /api/books).
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>, AppError> {
    let books = state.catalog.find_all().await?;
    Ok(Json(books))
}

/// Create a new book (POST /api/books).
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<Json<CreateBookRequest>, JsonRejection>,
) -> Result<impl IntoResponse, axum::response::Response> {
    let Json(request) = payload
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()).into_response())?;

    let new_book = request
        .into_new_book()
        .map_err(|e| AppError::from(e).into_response())?;

    let book = state
        .catalog
        .create(new_book)
        .await
        .map_err(|e| AppError::from(e).into_response())?;

    tracing::info!(book_id = %book.id, title = %book.title, "Created new book");

    Ok((StatusCode::CREATED, Json(book)))
}

/// Get a single book by ID (GET /api/books/{id}).
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = BookId::new(id);
    match state.catalog.find_one(&id).await? {
        Some(book) => Ok(Json(book)),
        None => Err(not_found(id)),
    }
}

/// Update a book by ID (PUT /api/books/{id}). Absent fields are unchanged.
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateBookRequest>, JsonRejection>,
) -> Result<Json<Book>, axum::response::Response> {
    let Json(request) = payload
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()).into_response())?;

    let patch = request
        .into_patch()
        .map_err(|e| AppError::from(e).into_response())?;

    let id = BookId::new(id);
    let updated = state
        .catalog
        .update(&id, patch)
        .await
        .map_err(|e| AppError::from(e).into_response())?;

    match updated {
        Some(book) => {
            tracing::info!(book_id = %book.id, "Updated book");
            Ok(Json(book))
        }
        None => Err(not_found(id).into_response()),
    }
}

/// Delete a book by ID (DELETE /api/books/{id}). Returns the removed book.
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>, AppError> {
    let id = BookId::new(id);
    match state.catalog.delete(&id).await? {
        Some(book) => {
            tracing::info!(book_id = %book.id, "Deleted book");
            Ok(Json(book))
        }
        None => Err(not_found(id)),
    }
}
