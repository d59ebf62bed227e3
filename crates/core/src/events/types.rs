use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::book::{Book, BookId};

/// Topic carrying book creation events.
pub const BOOK_CREATED_TOPIC: &str = "book.created";

/// Older name of [`BOOK_CREATED_TOPIC`], still consumed with the same handler.
pub const LEGACY_BOOK_CREATED_TOPIC: &str = "book_created";

/// Every topic a creation event may arrive on.
pub const BOOK_CREATED_TOPICS: [&str; 2] = [BOOK_CREATED_TOPIC, LEGACY_BOOK_CREATED_TOPIC];

/// A message as delivered by a bus consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub topic: String,
    /// Backend-specific position, used for acknowledgement.
    pub id: String,
    pub value: Vec<u8>,
}

impl BusMessage {
    pub fn new(topic: impl Into<String>, id: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            id: id.into(),
            value: value.into(),
        }
    }
}

/// Decoded message payload handed to event handlers.
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Structured(Value),
    Raw(Vec<u8>),
}

impl EventPayload {
    /// Parses the bytes as JSON, falling back to the raw bytes.
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(bytes.to_vec()),
        }
    }

    /// Short human-readable form for logs.
    pub fn describe(&self) -> String {
        match self {
            Self::Structured(value) => value.to_string(),
            Self::Raw(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Wire shape of a creation event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCreatedEvent {
    #[serde(rename = "_id", alias = "id")]
    pub id: BookId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<u32>,
}

impl From<&Book> for BookCreatedEvent {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            title: book.title.clone(),
            author: book.author.clone(),
            published_year: book.published_year,
        }
    }
}

impl BookCreatedEvent {
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Extracts the book id from a creation payload.
///
/// Accepts `_id` or `id` holding a non-empty string. Raw payloads carry no id.
pub fn extract_book_id(payload: &EventPayload) -> Option<BookId> {
    let EventPayload::Structured(Value::Object(map)) = payload else {
        return None;
    };

    id_field(map, "_id")
        .or_else(|| id_field(map, "id"))
        .map(BookId::from)
}

fn id_field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    map.get(name)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Result of a best-effort publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    SentAfterRetry { retries: u32 },
    /// The publisher was not connected; nothing was attempted.
    Skipped,
    /// Sending failed and retries, if any, were exhausted.
    Abandoned,
}

impl PublishOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent | Self::SentAfterRetry { .. })
    }
}
