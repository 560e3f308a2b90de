pub mod database;
pub mod memory;
pub mod metrics;
pub mod store;

pub use database::MongoBookStore;
pub use memory::InMemoryBookStore;
pub use metrics::{get_metrics, init_metrics, record_app_info};
pub use store::BookStore;
