//! Event bus: backends plus the publisher and subscriber that wrap them.
//!
//! # Feature Flags
//!
//! - `memory` (default): in-process broker, single instance only
//! - `redis`: Redis Streams with durable consumer groups
//!
//! The memory broker is also compiled for tests, whatever the feature set.

#[cfg(any(feature = "memory", test))]
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis_impl;

mod bus;
mod publisher;
mod subscriber;

pub use bus::{BusHandle, BusStatus, EventBus};
pub use publisher::BusPublisher;
pub use subscriber::BusSubscriber;
