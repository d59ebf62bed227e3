//! Cache backend implementations.
//!
//! Concrete implementations of [`booksync_core::cache::Cache`], selected at
//! compile time via feature flags.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process LRU cache with lazy TTL expiry
//! - `redis`: Redis cache using the redis crate
//!
//! The memory backend is also compiled for tests, whatever the feature set.

#[cfg(any(feature = "memory", test))]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

#[cfg(any(feature = "memory", test))]
pub use memory::MemoryCache;

#[cfg(feature = "redis")]
pub use redis_impl::RedisCache;
