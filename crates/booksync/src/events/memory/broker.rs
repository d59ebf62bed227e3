use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use booksync_core::events::{BusConsumer, BusError, BusMessage, BusProducer, Result};

#[derive(Debug, Default)]
struct GroupOffsets {
    /// Next offset that has not been acknowledged.
    committed: usize,
    /// Next offset to hand out.
    cursor: usize,
}

#[derive(Debug, Default)]
struct TopicLog {
    messages: Vec<Vec<u8>>,
    groups: HashMap<String, GroupOffsets>,
}

#[derive(Debug)]
struct BrokerInner {
    reachable: bool,
    auto_create_topics: bool,
    topics: Mutex<HashMap<String, TopicLog>>,
    appended: Notify,
}

/// Shared in-process broker. Clones refer to the same topics.
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBroker {
    /// Creates a broker that rejects sends to missing topics.
    pub fn new() -> Self {
        Self::build(true, false)
    }

    /// Creates a broker that creates topics on first send.
    pub fn with_auto_create_topics() -> Self {
        Self::build(true, true)
    }

    /// Creates a broker that refuses every connection.
    pub fn unreachable() -> Self {
        Self::build(false, false)
    }

    fn build(reachable: bool, auto_create_topics: bool) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                reachable,
                auto_create_topics,
                topics: Mutex::new(HashMap::new()),
                appended: Notify::new(),
            }),
        }
    }

    pub fn producer(&self) -> MemoryProducer {
        MemoryProducer {
            broker: self.clone(),
            connected: AtomicBool::new(false),
        }
    }

    pub fn consumer(&self, group_id: impl Into<String>) -> MemoryConsumer {
        MemoryConsumer {
            broker: self.clone(),
            group_id: group_id.into(),
            connected: AtomicBool::new(false),
        }
    }

    /// Every payload appended to `topic`, oldest first.
    pub async fn messages(&self, topic: &str) -> Vec<Vec<u8>> {
        let topics = self.inner.topics.lock().await;
        topics
            .get(topic)
            .map(|log| log.messages.clone())
            .unwrap_or_default()
    }

    /// Removes a topic and its offsets.
    pub async fn delete_topic(&self, topic: &str) {
        self.inner.topics.lock().await.remove(topic);
    }

    fn connect(&self) -> Result<()> {
        if self.inner.reachable {
            Ok(())
        } else {
            Err(BusError::ConnectionFailed(
                "memory broker is unreachable".to_string(),
            ))
        }
    }
}

/// Producer handle on a [`MemoryBroker`].
#[derive(Debug)]
pub struct MemoryProducer {
    broker: MemoryBroker,
    connected: AtomicBool,
}

impl MemoryProducer {
    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BusError::NotConnected)
        }
    }
}

#[async_trait]
impl BusProducer for MemoryProducer {
    async fn connect(&self) -> Result<()> {
        self.broker.connect()?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let topics = self.broker.inner.topics.lock().await;
        let mut names: Vec<String> = topics.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_topic(&self, topic: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut topics = self.broker.inner.topics.lock().await;
        if topics.contains_key(topic) {
            return Err(BusError::TopicAlreadyExists(topic.to_string()));
        }
        topics.insert(topic.to_string(), TopicLog::default());
        Ok(())
    }

    async fn send(&self, topic: &str, value: &[u8]) -> Result<()> {
        self.ensure_connected()?;
        let inner = &self.broker.inner;
        {
            let mut topics = inner.topics.lock().await;
            if !topics.contains_key(topic) && !inner.auto_create_topics {
                return Err(BusError::UnknownTopic(topic.to_string()));
            }
            topics
                .entry(topic.to_string())
                .or_default()
                .messages
                .push(value.to_vec());
        }
        inner.appended.notify_waiters();
        Ok(())
    }
}

/// Consumer handle on a [`MemoryBroker`], bound to one group.
#[derive(Debug)]
pub struct MemoryConsumer {
    broker: MemoryBroker,
    group_id: String,
    connected: AtomicBool,
}

impl MemoryConsumer {
    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(BusError::NotConnected)
        }
    }

    /// Hands out every message past the group cursor.
    async fn take_available(&self, topic: &str) -> Result<Vec<BusMessage>> {
        let mut topics = self.broker.inner.topics.lock().await;
        let log = topics
            .get_mut(topic)
            .ok_or_else(|| BusError::UnknownTopic(topic.to_string()))?;
        let offsets = log
            .groups
            .get_mut(&self.group_id)
            .ok_or_else(|| BusError::SubscribeFailed(format!("not subscribed to {topic}")))?;

        let start = offsets.cursor;
        offsets.cursor = log.messages.len();

        Ok(log.messages[start..]
            .iter()
            .enumerate()
            .map(|(i, value)| BusMessage::new(topic, (start + i).to_string(), value.clone()))
            .collect())
    }
}

#[async_trait]
impl BusConsumer for MemoryConsumer {
    async fn connect(&self) -> Result<()> {
        self.broker.connect()?;
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        self.ensure_connected()?;
        let mut topics = self.broker.inner.topics.lock().await;
        let log = topics.entry(topic.to_string()).or_default();
        let end = log.messages.len();
        let offsets = log
            .groups
            .entry(self.group_id.clone())
            .or_insert_with(|| GroupOffsets {
                committed: end,
                cursor: end,
            });
        // Resume after the last acknowledged message.
        offsets.cursor = offsets.committed;
        Ok(())
    }

    async fn poll(&self, topic: &str, max_wait: Duration) -> Result<Vec<BusMessage>> {
        let deadline = Instant::now() + max_wait;
        loop {
            self.ensure_connected()?;
            let appended = self.broker.inner.appended.notified();

            let batch = self.take_available(topic).await?;
            if !batch.is_empty() {
                return Ok(batch);
            }

            if tokio::time::timeout_at(deadline, appended).await.is_err() {
                return Ok(Vec::new());
            }
        }
    }

    async fn ack(&self, message: &BusMessage) -> Result<()> {
        self.ensure_connected()?;
        let offset: usize = message
            .id
            .parse()
            .map_err(|_| BusError::SubscribeFailed(format!("invalid offset {}", message.id)))?;

        let mut topics = self.broker.inner.topics.lock().await;
        let offsets = topics
            .get_mut(&message.topic)
            .and_then(|log| log.groups.get_mut(&self.group_id))
            .ok_or_else(|| BusError::SubscribeFailed(format!("not subscribed to {}", message.topic)))?;
        offsets.committed = offsets.committed.max(offset + 1);
        Ok(())
    }
}
