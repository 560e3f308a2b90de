use crate::models::{BookId, ID_FIELD};
use crate::services::BookStore;
use async_trait::async_trait;
use mongodb::bson::{Bson, Document};
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local `BookStore` with the same counting rules as MongoDB.
///
/// Books are kept in insertion order. Updates follow `$set` path rules:
/// `"author.name"` writes into the nested `author` document, and a path with
/// an empty or `$`-prefixed segment is rejected as a database error.
#[derive(Clone, Default)]
pub struct InMemoryBookStore {
    books: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn has_id(book: &Document, id: &BookId) -> bool {
    matches!(book.get(ID_FIELD), Some(Bson::ObjectId(oid)) if *oid == id.object_id())
}

fn invalid_path(path: &str) -> Option<AppError> {
    let bad = path
        .split('.')
        .find(|segment| segment.is_empty() || segment.starts_with('$'))?;
    Some(AppError::DatabaseError(anyhow::anyhow!(
        "Invalid update path '{}': segment '{}' is empty or starts with '$'",
        path,
        bad
    )))
}

/// Sets `value` at the dotted `path`, creating intermediate documents.
/// Returns whether the stored value changed.
fn set_path(book: &mut Document, path: &str, value: Bson) -> Result<bool, AppError> {
    let mut target = book;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            if target.get(segment) == Some(&value) {
                return Ok(false);
            }
            target.insert(segment, value);
            return Ok(true);
        }

        let child = target
            .entry(segment.to_string())
            .or_insert_with(|| Bson::Document(Document::new()));
        target = match child {
            Bson::Document(nested) => nested,
            other => {
                return Err(AppError::DatabaseError(anyhow::anyhow!(
                    "Cannot create field in '{}': existing value is {:?}",
                    segment,
                    other.element_type()
                )));
            }
        };
    }
    Ok(false)
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn list_all(&self) -> Result<Vec<Document>, AppError> {
        Ok(self.books.read().await.clone())
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Document>, AppError> {
        let books = self.books.read().await;
        Ok(books.iter().find(|book| has_id(book, id)).cloned())
    }

    async fn insert(&self, fields: Document) -> Result<BookId, AppError> {
        let id = BookId::new();
        let mut book = Document::new();
        book.insert(ID_FIELD, id);
        for (key, value) in fields {
            if key != ID_FIELD {
                book.insert(key, value);
            }
        }

        self.books.write().await.push(book);
        tracing::debug!(book_id = %id, "Inserted book into memory store");
        Ok(id)
    }

    async fn update_by_id(&self, id: &BookId, fields: Document) -> Result<u64, AppError> {
        if let Some(err) = fields.keys().find_map(|key| invalid_path(key)) {
            return Err(err);
        }

        let mut books = self.books.write().await;
        let Some(book) = books.iter_mut().find(|book| has_id(book, id)) else {
            return Ok(0);
        };

        // Apply to a copy so a failing path leaves the stored book untouched.
        let mut updated = book.clone();
        let mut modified = false;
        for (key, value) in fields {
            if key == ID_FIELD {
                continue;
            }
            modified |= set_path(&mut updated, &key, value)?;
        }
        *book = updated;

        if !modified {
            tracing::debug!(book_id = %id, "Update matched a book but changed nothing");
        }
        Ok(u64::from(modified))
    }

    async fn delete_by_id(&self, id: &BookId) -> Result<u64, AppError> {
        let mut books = self.books.write().await;
        match books.iter().position(|book| has_id(book, id)) {
            Some(index) => {
                books.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[tokio::test]
    async fn inserted_fields_come_back_with_an_id() {
        let store = InMemoryBookStore::new();
        let id = store
            .insert(doc! { "title": "Dune", "price": 15 })
            .await
            .unwrap();

        let book = store.find_by_id(&id).await.unwrap().expect("book should exist");
        assert_eq!(book.get_object_id(ID_FIELD).unwrap(), id.object_id());
        assert_eq!(book.get_str("title").unwrap(), "Dune");
        assert_eq!(book.get_i32("price").unwrap(), 15);
        assert_eq!(book.len(), 3);
    }

    #[tokio::test]
    async fn each_insert_gets_a_distinct_id() {
        let store = InMemoryBookStore::new();
        let first = store.insert(doc! { "title": "Dune" }).await.unwrap();
        let second = store.insert(doc! { "title": "Dune" }).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_merges_only_supplied_fields() {
        let store = InMemoryBookStore::new();
        let id = store
            .insert(doc! { "title": "Dune", "price": 15 })
            .await
            .unwrap();

        let modified = store
            .update_by_id(&id, doc! { "price": 9.99, "edition": 2 })
            .await
            .unwrap();
        assert_eq!(modified, 1);

        let book = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(book.get_f64("price").unwrap(), 9.99);
        assert_eq!(book.get_str("title").unwrap(), "Dune");
        assert_eq!(book.get_i32("edition").unwrap(), 2);
    }

    #[tokio::test]
    async fn update_reports_zero_for_unknown_id_and_no_op() {
        let store = InMemoryBookStore::new();
        let id = store.insert(doc! { "title": "Dune" }).await.unwrap();

        assert_eq!(
            store
                .update_by_id(&BookId::new(), doc! { "title": "Emma" })
                .await
                .unwrap(),
            0
        );
        assert_eq!(
            store
                .update_by_id(&id, doc! { "title": "Dune" })
                .await
                .unwrap(),
            0
        );
        assert_eq!(store.update_by_id(&id, doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn update_cannot_change_the_identifier() {
        let store = InMemoryBookStore::new();
        let id = store.insert(doc! { "title": "Dune" }).await.unwrap();

        let modified = store
            .update_by_id(&id, doc! { "_id": BookId::new() })
            .await
            .unwrap();
        assert_eq!(modified, 0);
        assert!(store.find_by_id(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_the_book_once() {
        let store = InMemoryBookStore::new();
        let id = store.insert(doc! { "title": "Dune" }).await.unwrap();

        assert_eq!(store.delete_by_id(&id).await.unwrap(), 1);
        assert!(store.find_by_id(&id).await.unwrap().is_none());
        assert_eq!(store.delete_by_id(&id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn dotted_keys_update_nested_documents() {
        let store = InMemoryBookStore::new();
        let id = store
            .insert(doc! { "title": "Dune", "author": { "name": "Frank", "born": 1920 } })
            .await
            .unwrap();

        let modified = store
            .update_by_id(&id, doc! { "author.name": "Frank Herbert", "series.index": 1 })
            .await
            .unwrap();
        assert_eq!(modified, 1);

        let book = store.find_by_id(&id).await.unwrap().unwrap();
        let author = book.get_document("author").unwrap();
        assert_eq!(author.get_str("name").unwrap(), "Frank Herbert");
        assert_eq!(author.get_i32("born").unwrap(), 1920);
        assert_eq!(book.get_document("series").unwrap(), &doc! { "index": 1 });
        assert!(book.get("author.name").is_none());

        assert_eq!(
            store
                .update_by_id(&id, doc! { "author.name": "Frank Herbert" })
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn dollar_and_empty_path_segments_are_rejected() {
        let store = InMemoryBookStore::new();
        let id = store.insert(doc! { "title": "Dune" }).await.unwrap();

        for fields in [
            doc! { "$title": "Emma" },
            doc! { "author.$name": "Austen" },
            doc! { "author..name": "Austen" },
            doc! { "title": "Emma", "$price": 3 },
        ] {
            let result = store.update_by_id(&id, fields.clone()).await;
            assert!(
                matches!(result, Err(AppError::DatabaseError(_))),
                "{fields:?} should be rejected"
            );
        }

        let book = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(book, doc! { "_id": id.object_id(), "title": "Dune" });
    }

    #[tokio::test]
    async fn path_through_a_scalar_fails_without_partial_writes() {
        let store = InMemoryBookStore::new();
        let id = store
            .insert(doc! { "title": "Dune", "author": "Frank Herbert" })
            .await
            .unwrap();

        let result = store
            .update_by_id(&id, doc! { "title": "Emma", "author.name": "Austen" })
            .await;
        assert!(matches!(result, Err(AppError::DatabaseError(_))));

        let book = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(book.get_str("title").unwrap(), "Dune");
        assert_eq!(book.get_str("author").unwrap(), "Frank Herbert");
    }
}
