//! In-memory storage backend.
//!
//! Stores books in a HashMap wrapped in `Arc<RwLock<_>>`. Useful for tests
//! and development where persistence is not required.
//!
//! # Example
//!
//! ```rust,ignore
//! use booksync::storage::inmemory::InMemoryRepository;
//!
//! let repo = InMemoryRepository::new();
//! let book = repo.create(NewBook::new("Dune", "Herbert")).await?;
//! ```

mod repository;

pub use repository::InMemoryRepository;
