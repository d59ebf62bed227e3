use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{BusMessage, EventPayload, HandlerError, PublishOutcome, Result};

/// Producer side of a bus backend.
///
/// Methods map one-to-one to broker calls; retry and state handling live in
/// the publisher that wraps it.
#[async_trait]
pub trait BusProducer: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Lists the topics known to the broker.
    async fn list_topics(&self) -> Result<Vec<String>>;

    /// Creates a topic. Fails with `BusError::TopicAlreadyExists` when present.
    async fn create_topic(&self, topic: &str) -> Result<()>;

    /// Appends a message. Fails with `BusError::UnknownTopic` when the topic
    /// does not exist.
    async fn send(&self, topic: &str, value: &[u8]) -> Result<()>;
}

/// Consumer side of a bus backend, bound to one durable consumer group.
#[async_trait]
pub trait BusConsumer: Send + Sync {
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Consumer group the consumer commits offsets under.
    fn group_id(&self) -> &str;

    /// Registers the group on `topic`. Resubscribing resumes from the last
    /// acknowledged message.
    async fn subscribe(&self, topic: &str) -> Result<()>;

    /// Waits up to `max_wait` for messages on a subscribed topic.
    ///
    /// Returns an empty batch when nothing arrived in time. Messages come
    /// back in topic order.
    async fn poll(&self, topic: &str, max_wait: Duration) -> Result<Vec<BusMessage>>;

    /// Acknowledges a handled message for the group.
    async fn ack(&self, message: &BusMessage) -> Result<()>;
}

/// Best-effort event emission. Never fails the caller.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: &Value) -> PublishOutcome;
}

/// Receives decoded messages from a subscription.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(
        &self,
        topic: &str,
        payload: EventPayload,
    ) -> std::result::Result<(), HandlerError>;
}
