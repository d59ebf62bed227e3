use thiserror::Error;

use crate::storage::RepositoryError;

/// Errors raised by bus backends, the publisher and the subscriber.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("Bus connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Bus is not connected")]
    NotConnected,
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),
    #[error("Topic already exists: {0}")]
    TopicAlreadyExists(String),
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Subscribe failed: {0}")]
    SubscribeFailed(String),
    #[error("Bus operation timed out after {0}ms")]
    Timeout(u128),
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Failure inside an event handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Handler failed: {0}")]
    Failed(String),
}
