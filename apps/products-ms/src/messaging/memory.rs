//! In-process broker with NATS subject semantics

use super::{MessageBroker, MessageStream, ReceivedMessage};
use async_trait::async_trait;
use eyre::{Result, eyre};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

struct Subscription {
    id: u64,
    pattern: String,
    sender: mpsc::UnboundedSender<ReceivedMessage>,
}

#[derive(Default)]
struct Inner {
    subscriptions: Mutex<Vec<Subscription>>,
    next_id: AtomicU64,
    disconnected: AtomicBool,
}

/// Broker that routes messages between subscribers of the same process
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_connected(&self, connected: bool) {
        self.inner.disconnected.store(!connected, Ordering::SeqCst);
    }

    /// Number of live subscriptions
    pub fn subscription_count(&self) -> usize {
        self.lock().len()
    }

    /// Send `payload` to `subject` with a reply inbox and wait for the answer
    pub async fn request(&self, subject: &str, payload: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let inbox = format!("_INBOX.{}", self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let mut replies = self.queue_subscribe(&inbox, "").await?;

        let delivered = self.deliver(ReceivedMessage {
            subject: subject.to_string(),
            payload: payload.to_vec(),
            reply: Some(inbox),
        })?;
        if !delivered {
            replies.close().await?;
            return Err(eyre!("No responders for {}", subject));
        }

        let reply = tokio::time::timeout(timeout, replies.next())
            .await
            .map_err(|_| eyre!("Timed out waiting for reply on {}", subject))?
            .ok_or_else(|| eyre!("Reply subscription closed"))?;

        replies.close().await?;
        Ok(reply.payload)
    }

    /// Deliver a message without a reply subject
    pub fn publish_no_reply(&self, subject: &str, payload: &[u8]) -> Result<()> {
        let delivered = self.deliver(ReceivedMessage {
            subject: subject.to_string(),
            payload: payload.to_vec(),
            reply: None,
        })?;
        if !delivered {
            debug!(subject, "No subscriber for message");
        }
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Subscription>> {
        // a poisoned lock only means a test panicked mid-publish
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Hand `message` to the first matching subscriber, like a single queue
    /// group member. `Ok(false)` when nobody is subscribed.
    fn deliver(&self, message: ReceivedMessage) -> Result<bool> {
        if self.inner.disconnected.load(Ordering::SeqCst) {
            return Err(eyre!("Broker is disconnected"));
        }

        let mut subscriptions = self.lock();
        subscriptions.retain(|s| !s.sender.is_closed());

        let Some(subscription) = subscriptions
            .iter()
            .find(|s| subject_matches(&s.pattern, &message.subject))
        else {
            return Ok(false);
        };

        subscription
            .sender
            .send(message)
            .map_err(|e| eyre!("Subscriber for {} went away", e.0.subject))?;
        Ok(true)
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|s| s.id != id);
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn publish_raw(&self, subject: &str, payload: &[u8]) -> Result<()> {
        self.publish_no_reply(subject, payload)
    }

    async fn queue_subscribe(
        &self,
        subject: &str,
        _queue_group: &str,
    ) -> Result<Box<dyn MessageStream>> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);

        self.lock().push(Subscription {
            id,
            pattern: subject.to_string(),
            sender,
        });

        Ok(Box::new(InMemoryStream {
            id,
            broker: self.clone(),
            receiver,
        }))
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.inner.disconnected.load(Ordering::SeqCst)
    }
}

struct InMemoryStream {
    id: u64,
    broker: InMemoryBroker,
    receiver: mpsc::UnboundedReceiver<ReceivedMessage>,
}

#[async_trait]
impl MessageStream for InMemoryStream {
    async fn next(&mut self) -> Option<ReceivedMessage> {
        self.receiver.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.broker.remove(self.id);
        self.receiver.close();
        Ok(())
    }
}

/// NATS wildcard matching: `*` matches one token, a trailing `>` one or more
fn subject_matches(pattern: &str, subject: &str) -> bool {
    let mut pattern_tokens = pattern.split('.');
    let mut subject_tokens = subject.split('.');

    loop {
        match (pattern_tokens.next(), subject_tokens.next()) {
            (Some(">"), Some(_)) => return true,
            (Some("*"), Some(_)) => continue,
            (Some(p), Some(s)) if p == s => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}
