pub mod book;
pub mod book_id;

pub use book::{fields_from_json, render_book, ID_FIELD};
pub use book_id::{BookId, InvalidIdentifierFormat};
