//! Event-driven cache refresh.
//!
//! Created events re-enter the coordinator here. The payload only names the
//! book; the record written to the cache always comes from the repository.

use async_trait::async_trait;

use booksync_core::cache::Cache;
use booksync_core::events::{
    extract_book_id, EventHandler, EventPayload, EventPublisher, HandlerError, BOOK_CREATED_TOPICS,
};
use booksync_core::storage::BookRepository;

use super::BookService;

impl<R, C, P> BookService<R, C, P>
where
    R: BookRepository,
    C: Cache,
    P: EventPublisher,
{
    /// Refreshes `item:<id>` for the book a created event names.
    ///
    /// Payloads without an id, and books that no longer exist, are logged and
    /// dropped. Only repository failures are reported.
    pub async fn on_created_event(&self, payload: &EventPayload) -> Result<(), HandlerError> {
        let Some(book_id) = extract_book_id(payload) else {
            tracing::warn!(payload = %payload.describe(), "Created event without book id, dropping");
            return Ok(());
        };

        let Some(book) = self.store(self.repository.find_by_id(&book_id)).await? else {
            tracing::info!(book_id = %book_id, "Created event for missing book, dropping");
            return Ok(());
        };

        self.cache_book(&book).await;
        tracing::debug!(book_id = %book_id, "Cache refreshed from created event");
        Ok(())
    }
}

#[async_trait]
impl<R, C, P> EventHandler for BookService<R, C, P>
where
    R: BookRepository + 'static,
    C: Cache + 'static,
    P: EventPublisher + 'static,
{
    async fn handle(&self, topic: &str, payload: EventPayload) -> Result<(), HandlerError> {
        if BOOK_CREATED_TOPICS.iter().any(|created| *created == topic) {
            return self.on_created_event(&payload).await;
        }

        tracing::warn!(topic = %topic, "No handler registered for topic");
        Ok(())
    }
}
