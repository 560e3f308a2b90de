use crate::models::{BookId, InvalidIdentifierFormat};
use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use service_core::error::AppError;

/// Decodes the `:id` path segment into a `BookId`.
///
/// Runs before any body extractor, so a malformed id is rejected with 400
/// without reading the body or touching the store.
#[derive(Debug, Clone, Copy)]
pub struct BookIdPath(pub BookId);

#[async_trait]
impl<S> FromRequestParts<S> for BookIdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| InvalidIdentifierFormat)?;

        let id = raw.parse::<BookId>().inspect_err(|_| {
            tracing::debug!(book_id = %raw, "Rejected malformed book id");
        })?;

        Ok(BookIdPath(id))
    }
}
