//! Redis Streams bus backend.
//!
//! A topic is a stream key. Topics are listed from a registry set, since
//! streams cannot be enumerated cheaply. Each message stores its payload
//! under a single field.

mod consumer;
mod error;
mod producer;

pub use consumer::RedisConsumer;
pub use producer::RedisProducer;

/// Set holding every topic created through the bus.
pub(crate) const TOPIC_REGISTRY_KEY: &str = "booksync:topics";

/// Stream field carrying the message payload.
pub(crate) const PAYLOAD_FIELD: &str = "value";

/// Group created to materialize a stream, destroyed right after.
pub(crate) const PROVISIONING_GROUP: &str = "booksync-provisioning";
