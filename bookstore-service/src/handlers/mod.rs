pub mod books;
pub mod health;

pub use books::{add_book, delete_book, get_book, list_books, update_book};
pub use health::{health_check, metrics_endpoint, readiness_check};
