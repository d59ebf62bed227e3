//! In-process message broker.
//!
//! Each topic is an append-only log; each consumer group keeps a committed
//! offset per topic, so a group that resubscribes picks up every message it
//! had not acknowledged.

mod broker;

pub use broker::{MemoryBroker, MemoryConsumer, MemoryProducer};
