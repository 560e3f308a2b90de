use crate::models::BookId;
use crate::services::BookStore;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    options::ClientOptions,
    Client as MongoClient, Collection, Database,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoBookStore {
    client: MongoClient,
    db: Database,
    collection: String,
}

impl MongoBookStore {
    /// Create the process-wide client. The driver owns the connection pool and
    /// connects lazily, so an unreachable server surfaces on first use.
    pub async fn connect(uri: &str, database: &str, collection: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, collection = %collection, "Connecting to MongoDB");
        let mut options = ClientOptions::parse(uri).await.map_err(|e| {
            tracing::error!("Failed to parse MongoDB connection string: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        options.app_name = Some("bookstore-service".to_string());

        let client = MongoClient::with_options(options).map_err(|e| {
            tracing::error!("Failed to create MongoDB client: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "MongoDB client ready");
        Ok(Self {
            client,
            db,
            collection: collection.to_string(),
        })
    }

    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    pub fn books(&self) -> Collection<Document> {
        self.db.collection(&self.collection)
    }
}

fn by_id(id: &BookId) -> Document {
    doc! { "_id": id.object_id() }
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn list_all(&self) -> Result<Vec<Document>, AppError> {
        let cursor = self.books().find(doc! {}, None).await.map_err(|e| {
            tracing::error!("Failed to list books: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        cursor.try_collect().await.map_err(|e| {
            tracing::error!("Failed to collect books: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Document>, AppError> {
        self.books().find_one(by_id(id), None).await.map_err(|e| {
            tracing::error!(book_id = %id, "Failed to find book: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })
    }

    async fn insert(&self, fields: Document) -> Result<BookId, AppError> {
        let result = self.books().insert_one(fields, None).await.map_err(|e| {
            tracing::error!("Failed to insert book: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;

        result
            .inserted_id
            .as_object_id()
            .map(BookId::from)
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!(
                    "Inserted book has a non-ObjectId identifier: {}",
                    result.inserted_id
                ))
            })
    }

    async fn update_by_id(&self, id: &BookId, fields: Document) -> Result<u64, AppError> {
        // `$set` rejects an empty document.
        if fields.is_empty() {
            return Ok(0);
        }

        let result = self
            .books()
            .update_one(by_id(id), doc! { "$set": fields }, None)
            .await
            .map_err(|e| {
                tracing::error!(book_id = %id, "Failed to update book: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        if result.matched_count > 0 && result.modified_count == 0 {
            tracing::debug!(book_id = %id, "Update matched a book but changed nothing");
        }

        Ok(result.modified_count)
    }

    async fn delete_by_id(&self, id: &BookId) -> Result<u64, AppError> {
        let result = self.books().delete_one(by_id(id), None).await.map_err(|e| {
            tracing::error!(book_id = %id, "Failed to delete book: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        Ok(result.deleted_count)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(())
    }
}
