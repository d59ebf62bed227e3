use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use booksync_core::events::{BusError, BusProducer, Result};

use super::error::{is_busy_group, map_redis_error};
use super::{PAYLOAD_FIELD, PROVISIONING_GROUP, TOPIC_REGISTRY_KEY};

/// Bus producer writing to Redis Streams.
pub struct RedisProducer {
    url: String,
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisProducer {
    /// Creates a disconnected producer for the broker at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            conn: RwLock::new(None),
        }
    }

    async fn conn(&self) -> Result<ConnectionManager> {
        self.conn.read().await.clone().ok_or(BusError::NotConnected)
    }
}

#[async_trait]
impl BusProducer for RedisProducer {
    async fn connect(&self) -> Result<()> {
        let client = redis::Client::open(self.url.as_str())
            .map_err(|e| map_redis_error(e, BusError::ConnectionFailed))?;
        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| map_redis_error(e, BusError::ConnectionFailed))?;
        *self.conn.write().await = Some(manager);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.conn.write().await.take();
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<String>> {
        let mut conn = self.conn().await?;
        conn.smembers(TOPIC_REGISTRY_KEY)
            .await
            .map_err(|e| map_redis_error(e, BusError::SendFailed))
    }

    async fn create_topic(&self, topic: &str) -> Result<()> {
        let mut conn = self.conn().await?;

        let exists: bool = conn
            .exists(topic)
            .await
            .map_err(|e| map_redis_error(e, BusError::SendFailed))?;
        if exists {
            conn.sadd::<_, _, ()>(TOPIC_REGISTRY_KEY, topic)
                .await
                .map_err(|e| map_redis_error(e, BusError::SendFailed))?;
            return Err(BusError::TopicAlreadyExists(topic.to_string()));
        }

        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(topic)
            .arg(PROVISIONING_GROUP)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match created {
            Ok(()) => {}
            Err(e) if is_busy_group(&e) => {
                return Err(BusError::TopicAlreadyExists(topic.to_string()));
            }
            Err(e) => return Err(map_redis_error(e, BusError::SendFailed)),
        }

        let destroyed: redis::RedisResult<i64> = redis::cmd("XGROUP")
            .arg("DESTROY")
            .arg(topic)
            .arg(PROVISIONING_GROUP)
            .query_async(&mut conn)
            .await;
        if let Err(err) = destroyed {
            tracing::warn!(topic = %topic, error = %err, "Failed to remove provisioning group");
        }

        conn.sadd::<_, _, ()>(TOPIC_REGISTRY_KEY, topic)
            .await
            .map_err(|e| map_redis_error(e, BusError::SendFailed))?;
        Ok(())
    }

    async fn send(&self, topic: &str, value: &[u8]) -> Result<()> {
        let mut conn = self.conn().await?;

        // NOMKSTREAM replies nil instead of creating a missing stream.
        let id: Option<String> = redis::cmd("XADD")
            .arg(topic)
            .arg("NOMKSTREAM")
            .arg("*")
            .arg(PAYLOAD_FIELD)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error(e, BusError::SendFailed))?;

        match id {
            Some(_) => Ok(()),
            None => Err(BusError::UnknownTopic(topic.to_string())),
        }
    }
}
