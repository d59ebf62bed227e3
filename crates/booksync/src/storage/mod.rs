//! Storage backend implementations.
//!
//! Concrete implementations of [`booksync_core::storage::BookRepository`],
//! selected at compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `inmemory` (default): HashMap-backed repository, no persistence
//! - `sqlite`: SQLite storage backend using `rusqlite` and `tokio-rusqlite`
//!
//! # Examples
//!
//! Build with SQLite:
//! ```bash
//! cargo build -p booksync --no-default-features --features sqlite,memory
//! ```

#[cfg(any(feature = "inmemory", test))]
pub mod inmemory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "inmemory", test))]
pub use inmemory::InMemoryRepository;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRepository;
