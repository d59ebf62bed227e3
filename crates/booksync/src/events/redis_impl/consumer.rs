use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use tokio::sync::{Mutex, RwLock};

use booksync_core::events::{BusConsumer, BusError, BusMessage, Result};

use super::error::{is_busy_group, map_redis_error};
use super::{PAYLOAD_FIELD, TOPIC_REGISTRY_KEY};

/// Entries fetched per read.
const READ_BATCH: usize = 100;

struct Connected {
    client: redis::Client,
    manager: ConnectionManager,
}

/// Read side of one subscription.
///
/// Blocking reads get their own connection so they never stall acks or the
/// other subscriptions.
struct StreamReader {
    conn: MultiplexedConnection,
    /// Pending entries of this consumer are replayed once before new ones.
    pending_drained: bool,
}

/// Bus consumer reading Redis Streams through a consumer group.
pub struct RedisConsumer {
    url: String,
    group_id: String,
    consumer_name: String,
    connected: RwLock<Option<Connected>>,
    readers: RwLock<HashMap<String, Arc<Mutex<StreamReader>>>>,
}

impl RedisConsumer {
    /// Creates a disconnected consumer.
    pub fn new(
        url: impl Into<String>,
        group_id: impl Into<String>,
        consumer_name: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            group_id: group_id.into(),
            consumer_name: consumer_name.into(),
            connected: RwLock::new(None),
            readers: RwLock::new(HashMap::new()),
        }
    }

    async fn manager(&self) -> Result<ConnectionManager> {
        self.connected
            .read()
            .await
            .as_ref()
            .map(|c| c.manager.clone())
            .ok_or(BusError::NotConnected)
    }

    async fn client(&self) -> Result<redis::Client> {
        self.connected
            .read()
            .await
            .as_ref()
            .map(|c| c.client.clone())
            .ok_or(BusError::NotConnected)
    }

    async fn reader(&self, topic: &str) -> Result<Arc<Mutex<StreamReader>>> {
        self.readers
            .read()
            .await
            .get(topic)
            .cloned()
            .ok_or_else(|| BusError::SubscribeFailed(format!("not subscribed to {topic}")))
    }
}

#[async_trait]
impl BusConsumer for RedisConsumer {
    async fn connect(&self) -> Result<()> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| map_redis_error(e, BusError::ConnectionFailed))?;
        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| map_redis_error(e, BusError::ConnectionFailed))?;
        *self.connected.write().await = Some(Connected { client, manager });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.readers.write().await.clear();
        self.connected.write().await.take();
        Ok(())
    }

    fn group_id(&self) -> &str {
        &self.group_id
    }

    async fn subscribe(&self, topic: &str) -> Result<()> {
        let mut manager = self.manager().await?;

        // A new group only sees messages added after it was created.
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(topic)
            .arg(&self.group_id)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut manager)
            .await;
        match created {
            Ok(()) => {
                tracing::info!(topic = %topic, group = %self.group_id, "Created consumer group");
            }
            Err(e) if is_busy_group(&e) => {
                tracing::debug!(topic = %topic, group = %self.group_id, "Consumer group already exists");
            }
            Err(e) => return Err(map_redis_error(e, BusError::SubscribeFailed)),
        }

        manager
            .sadd::<_, _, ()>(TOPIC_REGISTRY_KEY, topic)
            .await
            .map_err(|e| map_redis_error(e, BusError::SubscribeFailed))?;

        let conn = self
            .client()
            .await?
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| map_redis_error(e, BusError::SubscribeFailed))?;

        self.readers.write().await.insert(
            topic.to_string(),
            Arc::new(Mutex::new(StreamReader {
                conn,
                pending_drained: false,
            })),
        );
        Ok(())
    }

    async fn poll(&self, topic: &str, max_wait: Duration) -> Result<Vec<BusMessage>> {
        let reader = self.reader(topic).await?;
        let mut reader = reader.lock().await;

        let base = StreamReadOptions::default()
            .group(&self.group_id, &self.consumer_name)
            .count(READ_BATCH);
        let (start_id, opts) = if reader.pending_drained {
            // BLOCK 0 would wait forever.
            let block_ms = (max_wait.as_millis() as usize).max(1);
            (">", base.block(block_ms))
        } else {
            ("0", base)
        };

        let reply: Option<StreamReadReply> = reader
            .conn
            .xread_options(&[topic], &[start_id], &opts)
            .await
            .map_err(|e| map_redis_error(e, BusError::SubscribeFailed))?;

        let messages: Vec<BusMessage> = reply
            .map(|reply| reply.keys)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|key| key.ids)
            .map(|entry| {
                let value: Vec<u8> = entry.get(PAYLOAD_FIELD).unwrap_or_default();
                BusMessage::new(topic, entry.id, value)
            })
            .collect();

        if !reader.pending_drained && messages.len() < READ_BATCH {
            reader.pending_drained = true;
        }

        Ok(messages)
    }

    async fn ack(&self, message: &BusMessage) -> Result<()> {
        let mut manager = self.manager().await?;
        let _acked: i64 = manager
            .xack(&message.topic, &self.group_id, &[&message.id])
            .await
            .map_err(|e| map_redis_error(e, BusError::SubscribeFailed))?;
        Ok(())
    }
}
