use crate::models::BookId;
use async_trait::async_trait;
use mongodb::bson::Document;
use service_core::error::AppError;

/// Persistence for the `books` collection.
///
/// Documents are schemaless; the store assigns `_id` on insert and is the only
/// owner of book state. Concurrent writers to the same book race with
/// last-writer-wins semantics.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every book in the collection, in no guaranteed order.
    async fn list_all(&self) -> Result<Vec<Document>, AppError>;

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Document>, AppError>;

    /// Stores `fields` as a new book and returns its assigned identifier.
    async fn insert(&self, fields: Document) -> Result<BookId, AppError>;

    /// Merges `fields` into the matching book and returns the number of
    /// documents modified.
    ///
    /// Returns 0 both when no book matches and when the merge changes nothing.
    /// Keys are `$set` paths: `"author.name"` updates a nested field, and a
    /// key with an empty or `$`-prefixed segment fails with
    /// `AppError::DatabaseError`.
    async fn update_by_id(&self, id: &BookId, fields: Document) -> Result<u64, AppError>;

    /// Returns the number of documents deleted.
    async fn delete_by_id(&self, id: &BookId) -> Result<u64, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
