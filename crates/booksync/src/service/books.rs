use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use booksync_core::book::{Book, BookId, BookPatch, NewBook};
use booksync_core::cache::{
    deserialize_book, deserialize_books, item_key, serialize_book, serialize_books, Cache,
    CacheError, LIST_ALL_KEY,
};
use booksync_core::catalog::BookCatalog;
use booksync_core::events::{BookCreatedEvent, EventPublisher, BOOK_CREATED_TOPIC};
use booksync_core::storage::{BookRepository, RepositoryError, Result};

use super::{DEFAULT_CACHE_TIMEOUT, DEFAULT_STORE_TIMEOUT};

/// Cache-aside coordinator over a book repository.
///
/// - **Reads**: check the cache first, on miss read the repository and
///   populate the cache
/// - **Writes**: persist to the repository, invalidate the affected keys,
///   then re-populate the item key where a record is known
/// - **Creates** also emit a `book.created` event from a detached task
///
/// Created events are consumed back through the [`EventHandler`] impl, which
/// re-reads the repository and refreshes `item:<id>`. A created event that
/// arrives after a later update or delete of the same book can write a
/// stale or resurrected entry; it lives at most one TTL.
///
/// # Type Parameters
///
/// * `R` - The underlying repository
/// * `C` - The cache implementation
/// * `P` - The event publisher
///
/// [`EventHandler`]: booksync_core::events::EventHandler
pub struct BookService<R, C, P>
where
    R: BookRepository,
    C: Cache,
    P: EventPublisher,
{
    pub(super) repository: Arc<R>,
    pub(super) cache: Arc<C>,
    publisher: Arc<P>,
    ttl: Duration,
    cache_timeout: Duration,
    store_timeout: Duration,
}

impl<R, C, P> BookService<R, C, P>
where
    R: BookRepository,
    C: Cache,
    P: EventPublisher,
{
    /// Creates a coordinator with the default per-call timeouts.
    ///
    /// # Arguments
    ///
    /// * `repository` - The source of truth
    /// * `cache` - Read acceleration, never authoritative
    /// * `publisher` - Best-effort event emission
    /// * `ttl` - Time-to-live for every cache entry written
    pub fn new(repository: Arc<R>, cache: Arc<C>, publisher: Arc<P>, ttl: Duration) -> Self {
        Self {
            repository,
            cache,
            publisher,
            ttl,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, cache_timeout: Duration, store_timeout: Duration) -> Self {
        self.cache_timeout = cache_timeout;
        self.store_timeout = store_timeout;
        self
    }

    /// Runs a repository call under the store deadline.
    pub(super) async fn store<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .unwrap_or_else(|_| Err(RepositoryError::Timeout(self.store_timeout.as_millis())))
    }

    async fn cache_call<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, CacheError>>,
    ) -> std::result::Result<T, CacheError> {
        tokio::time::timeout(self.cache_timeout, call)
            .await
            .unwrap_or_else(|_| Err(CacheError::Timeout(self.cache_timeout.as_millis())))
    }

    async fn cached_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.cache_call(self.cache.get(key)).await {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "Cache read failed");
                None
            }
        }
    }

    async fn invalidate(&self, key: &str) {
        if let Err(err) = self.cache_call(self.cache.delete(key)).await {
            tracing::warn!(key = %key, error = %err, "Failed to invalidate cache key");
        }
    }

    async fn store_bytes(&self, key: &str, bytes: &[u8]) {
        if let Err(err) = self
            .cache_call(self.cache.set(key, bytes, Some(self.ttl)))
            .await
        {
            tracing::warn!(key = %key, error = %err, "Failed to populate cache");
        }
    }

    /// Writes `item:<id>` for `book`.
    pub(super) async fn cache_book(&self, book: &Book) {
        match serialize_book(book) {
            Ok(bytes) => self.store_bytes(&item_key(&book.id), &bytes).await,
            Err(err) => {
                tracing::warn!(book_id = %book.id, error = %err, "Failed to encode book for cache")
            }
        }
    }
}

impl<R, C, P> BookService<R, C, P>
where
    R: BookRepository,
    C: Cache,
    P: EventPublisher + 'static,
{
    fn publish_created(&self, book: &Book) {
        let publisher = Arc::clone(&self.publisher);
        let payload = BookCreatedEvent::from(book).to_value();
        let book_id = book.id.clone();

        tokio::spawn(async move {
            let outcome = publisher.publish(BOOK_CREATED_TOPIC, &payload).await;
            tracing::trace!(book_id = %book_id, ?outcome, "Created event publish finished");
        });
    }
}

#[async_trait]
impl<R, C, P> BookCatalog for BookService<R, C, P>
where
    R: BookRepository + 'static,
    C: Cache + 'static,
    P: EventPublisher + 'static,
{
    async fn create(&self, new_book: NewBook) -> Result<Book> {
        // 1. Persist to storage
        let book = self.store(self.repository.create(new_book)).await?;

        // 2. Invalidate the list and warm the item key
        self.invalidate(LIST_ALL_KEY).await;
        self.cache_book(&book).await;

        // 3. Announce the new book, without waiting for the bus
        self.publish_created(&book);

        tracing::debug!(book_id = %book.id, "Book created");
        Ok(book)
    }

    async fn find_one(&self, id: &BookId) -> Result<Option<Book>> {
        let cache_key = item_key(id);

        // Check cache first
        if let Some(bytes) = self.cached_bytes(&cache_key).await {
            match deserialize_book(&bytes) {
                Ok(book) => {
                    tracing::trace!(book_id = %id, "Cache hit for book");
                    return Ok(Some(book));
                }
                Err(err) => {
                    tracing::warn!(book_id = %id, error = %err, "Cached book failed to decode")
                }
            }
        }

        tracing::trace!(book_id = %id, "Cache miss for book");
        let book = self.store(self.repository.find_by_id(id)).await?;

        if let Some(ref b) = book {
            self.cache_book(b).await;
        }

        Ok(book)
    }

    async fn find_all(&self) -> Result<Vec<Book>> {
        if let Some(bytes) = self.cached_bytes(LIST_ALL_KEY).await {
            match deserialize_books(&bytes) {
                Ok(books) => {
                    tracing::trace!(count = books.len(), "Cache hit for book list");
                    return Ok(books);
                }
                Err(err) => tracing::warn!(error = %err, "Cached book list failed to decode"),
            }
        }

        tracing::trace!("Cache miss for book list");
        let books = self.store(self.repository.find_all()).await?;

        match serialize_books(&books) {
            Ok(bytes) => self.store_bytes(LIST_ALL_KEY, &bytes).await,
            Err(err) => tracing::warn!(error = %err, "Failed to encode book list for cache"),
        }

        Ok(books)
    }

    async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Option<Book>> {
        let updated = self.store(self.repository.update(id, patch)).await?;

        self.invalidate(LIST_ALL_KEY).await;
        self.invalidate(&item_key(id)).await;

        match updated {
            Some(ref book) => {
                self.cache_book(book).await;
                tracing::debug!(book_id = %id, "Book updated");
            }
            None => tracing::debug!(book_id = %id, "Update skipped, book not found"),
        }

        Ok(updated)
    }

    async fn delete(&self, id: &BookId) -> Result<Option<Book>> {
        let deleted = self.store(self.repository.delete(id)).await?;

        self.invalidate(LIST_ALL_KEY).await;
        self.invalidate(&item_key(id)).await;

        if deleted.is_some() {
            tracing::debug!(book_id = %id, "Book deleted");
        } else {
            tracing::debug!(book_id = %id, "Delete skipped, book not found");
        }

        Ok(deleted)
    }
}
