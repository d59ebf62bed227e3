//! Process-wide bus handles.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use booksync_core::events::{BusConsumer, BusProducer, ConnectionState};

use super::{BusPublisher, BusSubscriber};

/// Connection state of both bus roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusStatus {
    pub publisher: ConnectionState,
    pub subscriber: ConnectionState,
}

/// Backend-erased view of the bus handles held by the application state.
#[async_trait]
pub trait BusHandle: Send + Sync {
    fn status(&self) -> BusStatus;

    /// Stops the receive loops and disconnects both roles.
    async fn close(&self);
}

/// The publisher and subscriber opened at startup.
pub struct EventBus<P, C>
where
    P: BusProducer,
    C: BusConsumer,
{
    publisher: Arc<BusPublisher<P>>,
    subscriber: BusSubscriber<C>,
}

impl<P, C> EventBus<P, C>
where
    P: BusProducer,
    C: BusConsumer,
{
    pub fn new(publisher: Arc<BusPublisher<P>>, subscriber: BusSubscriber<C>) -> Self {
        Self {
            publisher,
            subscriber,
        }
    }
}

#[async_trait]
impl<P, C> BusHandle for EventBus<P, C>
where
    P: BusProducer + 'static,
    C: BusConsumer + 'static,
{
    fn status(&self) -> BusStatus {
        BusStatus {
            publisher: self.publisher.state(),
            subscriber: self.subscriber.state(),
        }
    }

    async fn close(&self) {
        self.subscriber.close().await;
        self.publisher.close().await;
        tracing::info!("Event bus closed");
    }
}
