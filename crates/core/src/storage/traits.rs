use async_trait::async_trait;

use crate::book::{Book, BookId, BookPatch, NewBook};

use super::Result;

/// Repository for book records. Implementations talk to the backing store
/// directly: no caching, no retries.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Persists a new book and returns it with its store-assigned id.
    async fn create(&self, new_book: NewBook) -> Result<Book>;

    /// Gets a book by its ID.
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>>;

    /// Gets all books in creation order.
    async fn find_all(&self) -> Result<Vec<Book>>;

    /// Applies a partial update. Returns `None` when the id does not exist.
    async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Option<Book>>;

    /// Deletes a book and returns the removed record, or `None` when absent.
    async fn delete(&self, id: &BookId) -> Result<Option<Book>>;
}
