//! Operation surface of the book coordinator.

use async_trait::async_trait;

use crate::book::{Book, BookId, BookPatch, NewBook};
use crate::storage::Result;

/// Book operations exposed to API layers.
///
/// The repository stays authoritative: only repository failures surface
/// here. Cache and bus problems are absorbed by implementations.
#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn create(&self, new_book: NewBook) -> Result<Book>;

    async fn find_one(&self, id: &BookId) -> Result<Option<Book>>;

    async fn find_all(&self) -> Result<Vec<Book>>;

    async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Option<Book>>;

    async fn delete(&self, id: &BookId) -> Result<Option<Book>>;
}
