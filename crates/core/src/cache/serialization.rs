//! Pure functions for serializing/deserializing books to/from cache bytes.
//!
//! JSON keeps cached values human-readable and easy to inspect with
//! `redis-cli GET`.

use thiserror::Error;

use crate::book::Book;

/// Errors that can occur during cache serialization/deserialization.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    /// Failed to serialize a value to bytes.
    #[error("Failed to serialize: {0}")]
    SerializeFailed(String),
    /// Failed to deserialize bytes to a value.
    #[error("Failed to deserialize: {0}")]
    DeserializeFailed(String),
}

/// Result type for serialization operations.
pub type Result<T> = std::result::Result<T, SerializationError>;

/// Serializes a book to JSON bytes.
pub fn serialize_book(book: &Book) -> Result<Vec<u8>> {
    serde_json::to_vec(book).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to a book.
pub fn deserialize_book(bytes: &[u8]) -> Result<Book> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

/// Serializes an ordered slice of books to JSON bytes.
pub fn serialize_books(books: &[Book]) -> Result<Vec<u8>> {
    serde_json::to_vec(books).map_err(|e| SerializationError::SerializeFailed(e.to_string()))
}

/// Deserializes JSON bytes to an ordered vector of books.
pub fn deserialize_books(bytes: &[u8]) -> Result<Vec<Book>> {
    serde_json::from_slice(bytes).map_err(|e| SerializationError::DeserializeFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{BookId, NewBook};

    fn dune() -> Book {
        Book::from_new(
            BookId::new("X"),
            NewBook::new("Dune", "Herbert").with_published_year(1965),
        )
    }

    #[test]
    fn test_book_survives_cache_encoding() {
        let book = dune();

        let bytes = serialize_book(&book).expect("serialize should succeed");
        let decoded = deserialize_book(&bytes).expect("deserialize should succeed");

        assert_eq!(book, decoded);
    }

    #[test]
    fn test_books_keep_their_order() {
        let books = vec![
            dune(),
            Book::from_new(BookId::new("Y"), NewBook::new("Emma", "Austen")),
        ];

        let bytes = serialize_books(&books).expect("serialize should succeed");
        let decoded = deserialize_books(&bytes).expect("deserialize should succeed");

        assert_eq!(decoded[0].id, BookId::new("X"));
        assert_eq!(decoded[1].id, BookId::new("Y"));
    }

    #[test]
    fn test_serialize_empty_books() {
        let bytes = serialize_books(&[]).expect("serialize should succeed");
        assert_eq!(bytes, b"[]");
        assert!(deserialize_books(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_deserialize_book_malformed_bytes() {
        let result = deserialize_book(b"not valid json");
        assert!(matches!(
            result,
            Err(SerializationError::DeserializeFailed(_))
        ));
    }

    #[test]
    fn test_deserialize_books_rejects_single_object() {
        let bytes = serialize_book(&dune()).unwrap();
        let result = deserialize_books(&bytes);
        assert!(matches!(
            result,
            Err(SerializationError::DeserializeFailed(_))
        ));
    }
}
