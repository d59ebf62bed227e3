//! Book coordinator.
//!
//! [`BookService`] decides, for every operation, how the repository, the
//! cache and the event bus are touched. The repository is authoritative;
//! cache and bus failures are logged and absorbed.

use std::time::Duration;

mod books;
mod refresh;

#[cfg(test)]
mod testing;

pub use books::BookService;

/// Deadline for a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for a single repository call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);
