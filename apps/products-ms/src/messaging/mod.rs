//! Messaging abstraction layer
//!
//! The RPC server only needs queue subscriptions and raw publishes, so the
//! broker trait is kept to those. [`NatsBroker`] is the production backend and
//! [`InMemoryBroker`] drives the server in tests.

mod memory;
mod nats_broker;

pub use memory::InMemoryBroker;
pub use nats_broker::NatsBroker;

use async_trait::async_trait;
use eyre::Result;

/// Received message with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Subject the message was received on
    pub subject: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Reply subject for request-reply patterns
    pub reply: Option<String>,
}

/// Abstract message broker interface
#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Publish raw bytes to a subject
    async fn publish_raw(&self, subject: &str, payload: &[u8]) -> Result<()>;

    /// Create a queue group subscription (load-balanced across replicas)
    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Box<dyn MessageStream>>;

    /// Wait until everything published so far has been handed to the server
    async fn flush(&self) -> Result<()>;

    fn is_connected(&self) -> bool;
}

/// Stream of incoming messages
#[async_trait]
pub trait MessageStream: Send + Sync {
    /// Receive the next message; `None` once the subscription is gone
    async fn next(&mut self) -> Option<ReceivedMessage>;

    /// Stop receiving new messages. Messages already buffered stay readable.
    async fn close(&mut self) -> Result<()>;
}
