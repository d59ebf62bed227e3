//! Test doubles shared by the coordinator tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};

use booksync_core::book::{Book, BookId, BookPatch, NewBook};
use booksync_core::cache::{Cache, CacheError, Result as CacheResult};
use booksync_core::events::{EventPublisher, PublishOutcome};
use booksync_core::storage::{BookRepository, RepositoryError, Result};

use crate::storage::InMemoryRepository;

pub fn dune() -> NewBook {
    NewBook::new("Dune", "Herbert").with_published_year(1965)
}

/// In-memory repository that counts reads and can be switched offline.
#[derive(Default)]
pub struct CountingRepository {
    inner: InMemoryRepository,
    pub find_by_id_calls: AtomicUsize,
    pub find_all_calls: AtomicUsize,
    failing: AtomicBool,
    latency: Option<Duration>,
}

impl CountingRepository {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Inserts a book without touching the call counters.
    pub async fn seed(&self, new_book: NewBook) -> Book {
        self.inner.create(new_book).await.unwrap()
    }

    async fn gate(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::ConnectionFailed("store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookRepository for CountingRepository {
    async fn create(&self, new_book: NewBook) -> Result<Book> {
        self.gate().await?;
        self.inner.create(new_book).await
    }

    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>> {
        self.find_by_id_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> Result<Vec<Book>> {
        self.find_all_calls.fetch_add(1, Ordering::SeqCst);
        self.gate().await?;
        self.inner.find_all().await
    }

    async fn update(&self, id: &BookId, patch: BookPatch) -> Result<Option<Book>> {
        self.gate().await?;
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &BookId) -> Result<Option<Book>> {
        self.gate().await?;
        self.inner.delete(id).await
    }
}

/// Cache whose every call fails.
pub struct FailingCache;

#[async_trait]
impl Cache for FailingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        Err(CacheError::ConnectionFailed("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
        Err(CacheError::ConnectionFailed("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::ConnectionFailed("connection refused".to_string()))
    }
}

/// Cache whose every call never completes.
pub struct HangingCache;

#[async_trait]
impl Cache for HangingCache {
    async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
        std::future::pending().await
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        std::future::pending().await
    }
}

/// Publisher that forwards every event to a channel.
pub struct RecordingPublisher {
    tx: mpsc::UnboundedSender<(String, Value)>,
    rx: Mutex<mpsc::UnboundedReceiver<(String, Value)>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Waits for the next published event.
    pub async fn next(&self) -> (String, Value) {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no event published")
            .expect("publisher channel closed")
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: &Value) -> PublishOutcome {
        let _ = self.tx.send((topic.to_string(), payload.clone()));
        PublishOutcome::Sent
    }
}
