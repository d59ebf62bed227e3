//! Application state with repository-based storage.
//!
//! This module defines the shared application state that is passed to all
//! request handlers. It holds the book coordinator as a trait object plus the
//! bus handles, and supports different backend combinations via feature
//! flags.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use booksync_core::cache::Cache;
use booksync_core::catalog::BookCatalog;
use booksync_core::events::{BusConsumer, BusProducer, BOOK_CREATED_TOPICS};
use booksync_core::storage::BookRepository;

use crate::config::Config;
use crate::events::{BusHandle, BusPublisher, BusStatus, BusSubscriber, EventBus};
use crate::service::BookService;

// ============================================================================
// Compile-time feature validation
// ============================================================================

// Storage features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "sqlite", feature = "inmemory"))]
compile_error!("Cannot enable both 'sqlite' and 'inmemory' storage features");

#[cfg(not(any(feature = "inmemory", feature = "sqlite")))]
compile_error!("Must enable exactly one storage feature: 'inmemory' or 'sqlite'");

// Cache and bus features: exactly one must be enabled, they are mutually exclusive
#[cfg(all(feature = "memory", feature = "redis"))]
compile_error!("Cannot enable both 'memory' and 'redis' backend features");

#[cfg(not(any(feature = "memory", feature = "redis")))]
compile_error!("Must enable exactly one backend feature: 'memory' or 'redis'");

/// Shared application state.
///
/// This is cloned for each request handler. The bus handles are opened once
/// by the factory and released by [`AppState::close`].
#[derive(Clone)]
pub struct AppState {
    /// Book coordinator (cache-aside over the configured repository).
    pub catalog: Arc<dyn BookCatalog>,
    /// Publisher and subscriber handles.
    pub bus: Arc<dyn BusHandle>,
}

impl AppState {
    fn build(catalog: Arc<dyn BookCatalog>, bus: Arc<dyn BusHandle>) -> Self {
        Self { catalog, bus }
    }

    /// Wires the coordinator over already opened backends, then acquires the
    /// bus.
    ///
    /// Bus failures are tolerated: the publisher stays disconnected and
    /// publishes become no-ops, the subscriber gives up after its backoff and
    /// the refresh path is disabled.
    async fn assemble<R, C, P, K>(
        repository: R,
        cache: C,
        producer: P,
        consumer: K,
        config: &Config,
    ) -> Self
    where
        R: BookRepository + 'static,
        C: Cache + 'static,
        P: BusProducer + 'static,
        K: BusConsumer + 'static,
    {
        let publisher = Arc::new(BusPublisher::new(
            producer,
            config.publish_retry(),
            config.backend_timeout(),
        ));
        publisher.open().await;

        let service = Arc::new(
            BookService::new(
                Arc::new(repository),
                Arc::new(cache),
                publisher.clone(),
                config.cache_ttl(),
            )
            .with_timeouts(config.backend_timeout(), config.store_timeout()),
        );

        let subscriber = BusSubscriber::new(
            consumer,
            config.connect_backoff(),
            config.backend_timeout(),
        );
        subscriber.open().await;
        if let Err(err) = subscriber
            .subscribe_all(&BOOK_CREATED_TOPICS, service.clone())
            .await
        {
            tracing::warn!(error = %err, "Cache refresh from created events is disabled");
        }

        Self::build(service, Arc::new(EventBus::new(publisher, subscriber)))
    }

    /// Connection state of the bus roles.
    pub fn bus_status(&self) -> BusStatus {
        self.bus.status()
    }

    /// Releases the bus handles.
    pub async fn close(&self) {
        self.bus.close().await;
    }

    /// Opens the state, runs `body`, and closes the bus handles on every exit
    /// path.
    ///
    /// A backend that fails to open aborts before the bus is acquired.
    pub async fn scoped<F, Fut, T>(config: &Config, body: F) -> anyhow::Result<T>
    where
        F: FnOnce(AppState) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        Self::new(config).await?.run_scoped(body).await
    }

    /// Runs `body` with a clone of this state, then closes it, even when the
    /// body fails or panics.
    pub async fn run_scoped<F, Fut, T>(self, body: F) -> anyhow::Result<T>
    where
        F: FnOnce(AppState) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let outcome = AssertUnwindSafe(body(self.clone())).catch_unwind().await;
        self.close().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

// ============================================================================
// Factory functions for different backend combinations
// ============================================================================

#[cfg(all(feature = "sqlite", feature = "memory"))]
mod sqlite_memory {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::events::memory::MemoryBroker;
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage, in-memory cache and an
        /// in-process bus.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = SqliteRepository::new(&config.sqlite_path).await?;
            let memory_cache = MemoryCache::new(config.cache_max_entries);
            let broker = MemoryBroker::new();

            Ok(Self::assemble(
                sqlite_repo,
                memory_cache,
                broker.producer(),
                broker.consumer(config.consumer_group.clone()),
                config,
            )
            .await)
        }
    }
}

#[cfg(all(feature = "sqlite", feature = "redis"))]
mod sqlite_redis {
    use super::*;
    use crate::cache::RedisCache;
    use crate::events::redis_impl::{RedisConsumer, RedisProducer};
    use crate::storage::SqliteRepository;

    impl AppState {
        /// Creates AppState with SQLite storage, Redis cache and Redis
        /// Streams bus.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let sqlite_repo = SqliteRepository::new(&config.sqlite_path).await?;
            let redis_cache = RedisCache::new(&config.redis_url).await?;

            Ok(Self::assemble(
                sqlite_repo,
                redis_cache,
                RedisProducer::new(config.broker_url.clone()),
                RedisConsumer::new(
                    config.broker_url.clone(),
                    config.consumer_group.clone(),
                    config.consumer_name.clone(),
                ),
                config,
            )
            .await)
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "memory"))]
mod inmemory_memory {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::events::memory::MemoryBroker;
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage, cache and bus.
        /// Useful for testing without any external dependencies.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let broker = MemoryBroker::new();

            Ok(Self::assemble(
                InMemoryRepository::new(),
                MemoryCache::new(config.cache_max_entries),
                broker.producer(),
                broker.consumer(config.consumer_group.clone()),
                config,
            )
            .await)
        }
    }
}

#[cfg(all(feature = "inmemory", feature = "redis"))]
mod inmemory_redis {
    use super::*;
    use crate::cache::RedisCache;
    use crate::events::redis_impl::{RedisConsumer, RedisProducer};
    use crate::storage::InMemoryRepository;

    impl AppState {
        /// Creates AppState with in-memory storage, Redis cache and Redis
        /// Streams bus.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let redis_cache = RedisCache::new(&config.redis_url).await?;

            Ok(Self::assemble(
                InMemoryRepository::new(),
                redis_cache,
                RedisProducer::new(config.broker_url.clone()),
                RedisConsumer::new(
                    config.broker_url.clone(),
                    config.consumer_group.clone(),
                    config.consumer_name.clone(),
                ),
                config,
            )
            .await)
        }
    }
}

// ============================================================================
// Test support - provides Default implementation for unit tests
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    use booksync_core::book::NewBook;
    use booksync_core::events::ConnectionState;

    use crate::cache::MemoryCache;
    use crate::events::memory::MemoryBroker;
    use crate::storage::InMemoryRepository;

    fn test_config() -> Config {
        Config::from_lookup(|key| match key {
            "CONNECT_MAX_ATTEMPTS" => Some("1".to_string()),
            "BACKEND_TIMEOUT_MS" => Some("200".to_string()),
            _ => None,
        })
    }

    async fn memory_state(broker: &MemoryBroker) -> AppState {
        AppState::assemble(
            InMemoryRepository::new(),
            MemoryCache::new(100),
            broker.producer(),
            broker.consumer("test-group"),
            &test_config(),
        )
        .await
    }

    #[tokio::test]
    async fn test_assemble_connects_both_roles() {
        let broker = MemoryBroker::new();
        let state = memory_state(&broker).await;

        assert_eq!(
            state.bus_status(),
            BusStatus {
                publisher: ConnectionState::Connected,
                subscriber: ConnectionState::Connected,
            }
        );
        state.close().await;
    }

    #[tokio::test]
    async fn test_assemble_tolerates_unreachable_bus() {
        let broker = MemoryBroker::unreachable();
        let state = memory_state(&broker).await;

        assert_eq!(state.bus_status().publisher, ConnectionState::Disconnected);
        assert_eq!(state.bus_status().subscriber, ConnectionState::Disconnected);

        let book = state
            .catalog
            .create(NewBook::new("Dune", "Herbert"))
            .await
            .unwrap();
        assert_eq!(state.catalog.find_one(&book.id).await.unwrap(), Some(book));
    }

    #[tokio::test]
    async fn test_run_scoped_returns_body_result_and_closes() {
        let broker = MemoryBroker::new();
        let state = memory_state(&broker).await;
        let observer = state.clone();

        let count = state
            .run_scoped(|state| async move {
                state.catalog.create(NewBook::new("Dune", "Herbert")).await?;
                Ok(state.catalog.find_all().await?.len())
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(observer.bus_status().publisher, ConnectionState::Disconnected);
        assert_eq!(observer.bus_status().subscriber, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_run_scoped_closes_when_body_fails() {
        let broker = MemoryBroker::new();
        let state = memory_state(&broker).await;
        let observer = state.clone();

        let result: anyhow::Result<()> = state
            .run_scoped(|_state| async { Err(anyhow::anyhow!("body failed")) })
            .await;

        assert_eq!(result.unwrap_err().to_string(), "body failed");
        assert_eq!(observer.bus_status().publisher, ConnectionState::Disconnected);
        assert_eq!(observer.bus_status().subscriber, ConnectionState::Disconnected);
    }

    async fn exploding_body(_state: AppState) -> anyhow::Result<()> {
        panic!("body panicked");
    }

    #[tokio::test]
    async fn test_run_scoped_closes_when_body_panics() {
        let broker = MemoryBroker::new();
        let state = memory_state(&broker).await;
        let observer = state.clone();

        let outcome = AssertUnwindSafe(state.run_scoped(exploding_body))
            .catch_unwind()
            .await;

        assert!(outcome.is_err());
        assert_eq!(observer.bus_status().publisher, ConnectionState::Disconnected);
    }

    #[cfg(all(feature = "inmemory", feature = "memory"))]
    #[tokio::test]
    async fn test_scoped_builds_from_config() {
        let result = AppState::scoped(&test_config(), |state| async move {
            Ok(state.bus_status())
        })
        .await
        .unwrap();

        assert_eq!(result.publisher, ConnectionState::Connected);
    }
}
