use bookstore_service::config::{
    BookstoreConfig, MongoConfig, ObservabilityConfig, StoreBackend,
};
use bookstore_service::services::{init_metrics, BookStore, InMemoryBookStore, MongoBookStore};
use bookstore_service::startup::Application;
use service_core::config::Config as CoreConfig;
use std::sync::{Arc, Once};
use uuid::Uuid;

static INIT_METRICS: Once = Once::new();

fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        init_metrics();
    });
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<dyn BookStore>,
    mongo: Option<(MongoBookStore, String)>,
}

impl TestApp {
    /// Spawn the service on a random port.
    ///
    /// Runs against MongoDB when `TEST_MONGODB_URI` is set (one fresh database
    /// per app), otherwise against the in-memory store. MongoDB coverage is
    /// opt-in: without that variable `MongoBookStore` (the empty `$set`
    /// shortcut, `inserted_id` decoding, the matched-but-unmodified path) is
    /// not exercised.
    pub async fn spawn() -> Self {
        ensure_metrics_initialized();

        let mongo_uri = std::env::var("TEST_MONGODB_URI").ok();
        let db_name = format!("bookstore_test_{}", Uuid::new_v4());

        let config = BookstoreConfig {
            common: CoreConfig { port: 0 },
            mongodb: MongoConfig {
                uri: mongo_uri
                    .clone()
                    .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
                database: db_name.clone(),
                collection: "books".to_string(),
            },
            store: if mongo_uri.is_some() {
                StoreBackend::Mongodb
            } else {
                StoreBackend::Memory
            },
            observability: ObservabilityConfig {
                log_level: "debug".to_string(),
                otlp_endpoint: None,
            },
        };

        let mut mongo = None;
        let store: Arc<dyn BookStore> = match config.store {
            StoreBackend::Mongodb => {
                let store = MongoBookStore::connect(
                    &config.mongodb.uri,
                    &config.mongodb.database,
                    &config.mongodb.collection,
                )
                .await
                .expect("Failed to connect to test MongoDB");
                mongo = Some((store.clone(), db_name));
                Arc::new(store)
            }
            StoreBackend::Memory => Arc::new(InMemoryBookStore::new()),
        };

        let app = Application::build_with_store(config, store)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let store = app.store();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            store,
            mongo,
        }
    }

    pub fn books_url(&self) -> String {
        format!("{}/books", self.address)
    }

    pub fn book_url(&self, id: &str) -> String {
        format!("{}/books/{}", self.address, id)
    }

    /// Drop the per-test MongoDB database, if any.
    pub async fn cleanup(&self) {
        if let Some((mongo, db_name)) = &self.mongo {
            let _ = mongo.client().database(db_name).drop(None).await;
        }
    }
}
