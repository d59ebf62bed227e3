//! Durable event subscriber.
//!
//! Connects with bounded exponential backoff, then runs one receive loop per
//! subscribed topic. A loop decodes each message, hands it to the handler and
//! acknowledges it, whatever the handler did. Handler errors and panics are
//! logged and never stop the loop.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use booksync_core::events::{
    AtomicConnectionState, BackoffPolicy, BusConsumer, BusError, BusMessage, ConnectionState,
    EventHandler, EventPayload, Result,
};

/// Longest a receive loop waits on the broker before checking for shutdown.
pub const DEFAULT_POLL_WAIT: Duration = Duration::from_secs(1);

/// Event subscriber over a bus consumer.
pub struct BusSubscriber<C>
where
    C: BusConsumer,
{
    consumer: Arc<C>,
    state: Arc<AtomicConnectionState>,
    backoff: BackoffPolicy,
    call_timeout: Duration,
    poll_wait: Duration,
    shutdown_tx: broadcast::Sender<()>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl<C> BusSubscriber<C>
where
    C: BusConsumer + 'static,
{
    /// Creates a disconnected subscriber.
    pub fn new(consumer: C, backoff: BackoffPolicy, call_timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            consumer: Arc::new(consumer),
            state: Arc::new(AtomicConnectionState::default()),
            backoff,
            call_timeout,
            poll_wait: DEFAULT_POLL_WAIT,
            shutdown_tx,
            loops: Mutex::new(Vec::new()),
        }
    }

    /// Overrides how long each poll waits for new messages.
    pub fn with_poll_wait(mut self, poll_wait: Duration) -> Self {
        self.poll_wait = poll_wait;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }

    /// Connects, retrying with backoff up to `max_attempts` times.
    ///
    /// Stays `Disconnected` after the last failed attempt.
    pub async fn open(&self) -> ConnectionState {
        if let Err(current) = self
            .state
            .transition(ConnectionState::Disconnected, ConnectionState::Connecting)
        {
            return current;
        }

        let max_attempts = self.backoff.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            if self.state.load() != ConnectionState::Connecting {
                tracing::info!("Event subscriber closed while connecting");
                return self.state.load();
            }
            match with_timeout(self.call_timeout, self.consumer.connect()).await {
                Ok(()) => {
                    if self
                        .state
                        .transition(ConnectionState::Connecting, ConnectionState::Connected)
                        .is_err()
                    {
                        if let Err(err) = with_timeout(self.call_timeout, self.consumer.disconnect()).await {
                            tracing::warn!(error = %err, "Event subscriber disconnect failed");
                        }
                        tracing::info!("Event subscriber closed while connecting");
                        return self.state.load();
                    }
                    tracing::info!(
                        group = %self.consumer.group_id(),
                        attempt,
                        "Event subscriber connected"
                    );
                    return ConnectionState::Connected;
                }
                Err(err) if attempt < max_attempts => {
                    let delay = self.backoff.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Event subscriber connect failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(
                        attempts = max_attempts,
                        error = %err,
                        "Event subscriber failed to connect, giving up"
                    );
                }
            }
        }

        let _ = self
            .state
            .transition(ConnectionState::Connecting, ConnectionState::Disconnected);
        self.state.load()
    }

    /// Subscribes `handler` to `topic` under the consumer group and starts
    /// its receive loop.
    pub async fn subscribe(&self, topic: &str, handler: Arc<dyn EventHandler>) -> Result<()> {
        if !self.state.is_connected() {
            tracing::error!(topic = %topic, "Cannot subscribe, event subscriber is not connected");
            return Err(BusError::NotConnected);
        }

        if let Err(err) = with_timeout(self.call_timeout, self.consumer.subscribe(topic)).await {
            tracing::error!(topic = %topic, error = %err, "Failed to subscribe");
            return Err(err);
        }

        let receive = ReceiveLoop {
            consumer: self.consumer.clone(),
            state: self.state.clone(),
            topic: topic.to_string(),
            handler,
            poll_wait: self.poll_wait,
            call_timeout: self.call_timeout,
        };
        let shutdown_rx = self.shutdown_tx.subscribe();
        self.loops
            .lock()
            .await
            .push(tokio::spawn(receive.run(shutdown_rx)));

        tracing::info!(topic = %topic, group = %self.consumer.group_id(), "Subscribed to topic");
        Ok(())
    }

    /// Subscribes the same handler to every topic in `topics`.
    ///
    /// Every topic is attempted; the first failure is returned.
    pub async fn subscribe_all(&self, topics: &[&str], handler: Arc<dyn EventHandler>) -> Result<()> {
        let mut first_err = None;
        for topic in topics {
            if let Err(err) = self.subscribe(topic, handler.clone()).await {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Stops every receive loop, waits for them, then disconnects.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(());

        let loops: Vec<JoinHandle<()>> = self.loops.lock().await.drain(..).collect();
        for handle in loops {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "Receive loop ended abnormally");
            }
        }

        if self.state.load() == ConnectionState::Connected {
            if let Err(err) = with_timeout(self.call_timeout, self.consumer.disconnect()).await {
                tracing::warn!(error = %err, "Event subscriber disconnect failed");
            }
            tracing::info!("Event subscriber disconnected");
        }
        self.state.store(ConnectionState::Disconnected);
    }
}

async fn with_timeout<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or(Err(BusError::Timeout(limit.as_millis())))
}

struct ReceiveLoop<C> {
    consumer: Arc<C>,
    state: Arc<AtomicConnectionState>,
    topic: String,
    handler: Arc<dyn EventHandler>,
    poll_wait: Duration,
    call_timeout: Duration,
}

impl<C> ReceiveLoop<C>
where
    C: BusConsumer + 'static,
{
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        tracing::debug!(topic = %self.topic, "Receive loop started");

        loop {
            let polled = tokio::select! {
                _ = shutdown_rx.recv() => break,
                polled = with_timeout(
                    self.poll_wait + self.call_timeout,
                    self.consumer.poll(&self.topic, self.poll_wait),
                ) => polled,
            };

            match polled {
                Ok(messages) => {
                    for message in messages {
                        self.dispatch(message).await;
                    }
                }
                Err(err) => {
                    if !self.state.is_connected() {
                        break;
                    }
                    tracing::warn!(topic = %self.topic, error = %err, "Poll failed");
                    tokio::select! {
                        _ = shutdown_rx.recv() => break,
                        _ = tokio::time::sleep(self.poll_wait) => {}
                    }
                }
            }
        }

        tracing::debug!(topic = %self.topic, "Receive loop stopped");
    }

    async fn dispatch(&self, message: BusMessage) {
        let payload = EventPayload::decode(&message.value);
        tracing::debug!(
            topic = %message.topic,
            message_id = %message.id,
            payload = %payload.describe(),
            "Received event"
        );

        let handled = AssertUnwindSafe(self.handler.handle(&message.topic, payload))
            .catch_unwind()
            .await;
        match handled {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(topic = %message.topic, message_id = %message.id, error = %err, "Event handler failed");
            }
            Err(_) => {
                tracing::error!(topic = %message.topic, message_id = %message.id, "Event handler panicked");
            }
        }

        if let Err(err) = with_timeout(self.call_timeout, self.consumer.ack(&message)).await {
            tracing::warn!(topic = %message.topic, message_id = %message.id, error = %err, "Failed to acknowledge event");
        }
    }
}
