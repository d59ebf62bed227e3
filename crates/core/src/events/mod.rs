//! Event bus abstractions.
//!
//! Connection state, errors and retry policies shared by the publisher and
//! subscriber, the wire types of the book events, and the traits bus backends
//! implement.

mod error;
mod policy;
mod state;
mod traits;
mod types;

pub use error::{BusError, HandlerError, Result};
pub use policy::{BackoffPolicy, PublishRetryPolicy};
pub use state::{AtomicConnectionState, ConnectionState};
pub use traits::{BusConsumer, BusProducer, EventHandler, EventPublisher};
pub use types::{
    extract_book_id, BookCreatedEvent, BusMessage, EventPayload, PublishOutcome,
    BOOK_CREATED_TOPIC, BOOK_CREATED_TOPICS, LEGACY_BOOK_CREATED_TOPIC,
};
