//! NATS implementation of the MessageBroker trait

use super::{MessageBroker, MessageStream, ReceivedMessage};
use async_nats::connection::State;
use async_nats::{Client, ServerAddr, Subscriber};
use async_trait::async_trait;
use eyre::{Result, WrapErr};
use tracing::{debug, instrument};

/// NATS-based message broker implementation
#[derive(Clone)]
pub struct NatsBroker {
    client: Client,
}

impl NatsBroker {
    /// Connect to any of `servers`, naming the connection `name`
    pub async fn connect(servers: &[String], name: &str) -> Result<Self> {
        let addrs = servers
            .iter()
            .map(|server| server.parse::<ServerAddr>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .wrap_err("Invalid NATS server address")?;

        let client = async_nats::ConnectOptions::new()
            .name(name)
            .connect(addrs)
            .await
            .wrap_err_with(|| format!("Failed to connect to NATS at {}", servers.join(",")))?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageBroker for NatsBroker {
    #[instrument(skip(self, payload), fields(subject = %subject, bytes = payload.len()))]
    async fn publish_raw(&self, subject: &str, payload: &[u8]) -> Result<()> {
        self.client
            .publish(subject.to_string(), payload.to_vec().into())
            .await
            .wrap_err("Failed to publish raw message")?;

        debug!("Published message");
        Ok(())
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        queue_group: &str,
    ) -> Result<Box<dyn MessageStream>> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_string(), queue_group.to_string())
            .await
            .wrap_err_with(|| format!("Failed to queue subscribe to {}", subject))?;

        Ok(Box::new(NatsMessageStream { subscriber }))
    }

    async fn flush(&self) -> Result<()> {
        self.client.flush().await.wrap_err("Failed to flush NATS client")
    }

    fn is_connected(&self) -> bool {
        matches!(self.client.connection_state(), State::Connected)
    }
}

/// NATS message stream wrapper
struct NatsMessageStream {
    subscriber: Subscriber,
}

#[async_trait]
impl MessageStream for NatsMessageStream {
    async fn next(&mut self) -> Option<ReceivedMessage> {
        use futures::StreamExt;

        self.subscriber.next().await.map(|msg| ReceivedMessage {
            subject: msg.subject.to_string(),
            payload: msg.payload.to_vec(),
            reply: msg.reply.map(|s| s.to_string()),
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.subscriber
            .unsubscribe()
            .await
            .wrap_err("Failed to unsubscribe")
    }
}
