use crate::middleware::BookIdPath;
use crate::models::{fields_from_json, render_book, ID_FIELD};
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, Json};
use mongodb::bson::Bson;
use serde::Serialize;
use serde_json::{Map, Value};
use service_core::error::AppError;

#[derive(Debug, Serialize)]
pub struct BookMessageResponse {
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<Value>,
}

fn book_not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Book not found"))
}

#[tracing::instrument(skip(state))]
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    let books = state.store.list_all().await?;
    tracing::debug!(count = books.len(), "Listed books");
    Ok(Json(books.into_iter().map(render_book).collect()))
}

#[tracing::instrument(skip(state))]
pub async fn get_book(
    State(state): State<AppState>,
    BookIdPath(id): BookIdPath,
) -> Result<Json<Value>, AppError> {
    match state.store.find_by_id(&id).await? {
        Some(book) => Ok(Json(render_book(book))),
        None => Err(book_not_found()),
    }
}

#[tracing::instrument(skip(state, payload))]
pub async fn add_book(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<BookMessageResponse>), AppError> {
    let fields = fields_from_json(payload)?;
    let id = state.store.insert(fields.clone()).await?;
    tracing::info!(book_id = %id, "Book added");

    let mut book = fields;
    book.insert(ID_FIELD, Bson::from(id));

    Ok((
        StatusCode::CREATED,
        Json(BookMessageResponse {
            message: "Book added",
            book: Some(render_book(book)),
        }),
    ))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_book(
    State(state): State<AppState>,
    BookIdPath(id): BookIdPath,
    Json(payload): Json<Map<String, Value>>,
) -> Result<Json<BookMessageResponse>, AppError> {
    // A no-op update also reports zero modified documents and lands here.
    let modified = state.store.update_by_id(&id, fields_from_json(payload)?).await?;
    if modified == 0 {
        return Err(book_not_found());
    }

    // The book may have been deleted between the update and this read.
    let book = state
        .store
        .find_by_id(&id)
        .await?
        .ok_or_else(book_not_found)?;
    tracing::info!(book_id = %id, "Book updated");

    Ok(Json(BookMessageResponse {
        message: "Book updated",
        book: Some(render_book(book)),
    }))
}

#[tracing::instrument(skip(state))]
pub async fn delete_book(
    State(state): State<AppState>,
    BookIdPath(id): BookIdPath,
) -> Result<Json<BookMessageResponse>, AppError> {
    if state.store.delete_by_id(&id).await? == 0 {
        return Err(book_not_found());
    }
    tracing::info!(book_id = %id, "Book deleted");

    Ok(Json(BookMessageResponse {
        message: "Book deleted",
        book: None,
    }))
}
