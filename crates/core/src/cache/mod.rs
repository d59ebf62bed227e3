mod error;
mod keys;
mod serialization;
mod traits;

pub use error::{CacheError, Result};
pub use keys::{item_key, DEFAULT_TTL, LIST_ALL_KEY};
pub use serialization::{
    deserialize_book, deserialize_books, serialize_book, serialize_books, SerializationError,
};
pub use traits::Cache;
