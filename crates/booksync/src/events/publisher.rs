//! Best-effort event publisher.
//!
//! Wraps a [`BusProducer`] with a connection state and the unknown-topic
//! retry policy. Failures are logged and reported as a [`PublishOutcome`];
//! nothing is ever returned to the caller as an error.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use booksync_core::events::{
    AtomicConnectionState, BusError, BusProducer, ConnectionState, EventPublisher,
    PublishOutcome, PublishRetryPolicy, Result,
};

/// Event publisher over a bus producer.
pub struct BusPublisher<P>
where
    P: BusProducer,
{
    producer: P,
    state: AtomicConnectionState,
    retry: PublishRetryPolicy,
    call_timeout: Duration,
}

impl<P> BusPublisher<P>
where
    P: BusProducer,
{
    /// Creates a disconnected publisher.
    ///
    /// * `retry` - what to do when a send hits an unknown topic
    /// * `call_timeout` - deadline applied to each producer call
    pub fn new(producer: P, retry: PublishRetryPolicy, call_timeout: Duration) -> Self {
        Self {
            producer,
            state: AtomicConnectionState::default(),
            retry,
            call_timeout,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    /// Connects the producer. On failure the publisher stays disconnected
    /// and every later publish is skipped.
    pub async fn open(&self) -> ConnectionState {
        if let Err(current) = self
            .state
            .transition(ConnectionState::Disconnected, ConnectionState::Connecting)
        {
            return current;
        }

        match self.call(self.producer.connect()).await {
            Ok(()) => {
                if self
                    .state
                    .transition(ConnectionState::Connecting, ConnectionState::Connected)
                    .is_ok()
                {
                    tracing::info!("Event publisher connected");
                } else {
                    // Closed while connecting
                    if let Err(err) = self.call(self.producer.disconnect()).await {
                        tracing::warn!(error = %err, "Event publisher disconnect failed");
                    }
                    tracing::info!("Event publisher closed before connecting");
                }
            }
            Err(err) => {
                self.state.store(ConnectionState::Disconnected);
                tracing::error!(error = %err, "Event publisher failed to connect, events will not be published");
            }
        }
        self.state.load()
    }

    /// Disconnects the producer if connected.
    pub async fn close(&self) {
        if self.state.load() == ConnectionState::Connected {
            if let Err(err) = self.call(self.producer.disconnect()).await {
                tracing::warn!(error = %err, "Event publisher disconnect failed");
            }
            tracing::info!("Event publisher disconnected");
        }
        self.state.store(ConnectionState::Disconnected);
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    async fn call<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .unwrap_or(Err(BusError::Timeout(self.call_timeout.as_millis())))
    }

    /// Creates the topic when the broker does not list it.
    async fn ensure_topic(&self, topic: &str) {
        match self.call(self.producer.list_topics()).await {
            Ok(topics) if topics.iter().any(|t| t == topic) => {}
            Ok(_) => self.create_topic(topic).await,
            Err(err) => {
                tracing::warn!(topic = %topic, error = %err, "Failed to list topics, sending anyway");
            }
        }
    }

    async fn create_topic(&self, topic: &str) {
        match self.call(self.producer.create_topic(topic)).await {
            Ok(()) => tracing::info!(topic = %topic, "Created topic"),
            Err(BusError::TopicAlreadyExists(_)) => {
                tracing::debug!(topic = %topic, "Topic already exists");
            }
            Err(err) => tracing::warn!(topic = %topic, error = %err, "Failed to create topic"),
        }
    }

    async fn send_with_retry(&self, topic: &str, bytes: &[u8]) -> PublishOutcome {
        let mut last_err = match self.call(self.producer.send(topic, bytes)).await {
            Ok(()) => return PublishOutcome::Sent,
            Err(err @ BusError::UnknownTopic(_)) => err,
            Err(err) => {
                tracing::error!(topic = %topic, error = %err, "Failed to publish event");
                return PublishOutcome::Abandoned;
            }
        };

        for retry in 1..=self.retry.max_retries {
            tracing::warn!(topic = %topic, retry, "Topic not found, creating and retrying");
            self.create_topic(topic).await;
            tokio::time::sleep(self.retry.backoff).await;

            match self.call(self.producer.send(topic, bytes)).await {
                Ok(()) => return PublishOutcome::SentAfterRetry { retries: retry },
                Err(err @ BusError::UnknownTopic(_)) => last_err = err,
                Err(err) => {
                    tracing::error!(topic = %topic, retry, error = %err, "Retry failed");
                    return PublishOutcome::Abandoned;
                }
            }
        }

        tracing::error!(topic = %topic, error = %last_err, "Giving up on event");
        PublishOutcome::Abandoned
    }
}

#[async_trait]
impl<P> EventPublisher for BusPublisher<P>
where
    P: BusProducer + 'static,
{
    async fn publish(&self, topic: &str, payload: &Value) -> PublishOutcome {
        if !self.state.is_connected() {
            tracing::warn!(topic = %topic, "Event publisher not connected, skipping publish");
            return PublishOutcome::Skipped;
        }

        self.ensure_topic(topic).await;

        let bytes = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(topic = %topic, error = %err, "Failed to serialize event");
                return PublishOutcome::Abandoned;
            }
        };

        let outcome = self.send_with_retry(topic, &bytes).await;
        if outcome.is_sent() {
            tracing::debug!(topic = %topic, ?outcome, "Event published");
        }
        outcome
    }
}
