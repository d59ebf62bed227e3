mod error;
mod requests;
mod types;

pub use error::BookError;
pub use requests::{CreateBookRequest, UpdateBookRequest};
pub use types::{Book, BookId, BookPatch, NewBook};
