//! Request/reply loop between the broker and the product handlers

use crate::messaging::{MessageBroker, MessageStream, ReceivedMessage};
use crate::shutdown::ShutdownCoordinator;
use domain_products::{ProductRepository, ProductService, dispatch};
use eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

/// Upper bound on waiting for one buffered message while draining
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Serves every product pattern under `{prefix}.>` through one queue subscription
pub struct RpcServer<B: MessageBroker, R: ProductRepository> {
    broker: Arc<B>,
    service: ProductService<R>,
    prefix: String,
    queue_group: String,
}

impl<B, R> RpcServer<B, R>
where
    B: MessageBroker + 'static,
    R: ProductRepository + 'static,
{
    pub fn new(
        broker: Arc<B>,
        service: ProductService<R>,
        prefix: impl Into<String>,
        queue_group: impl Into<String>,
    ) -> Self {
        Self {
            broker,
            service,
            prefix: prefix.into(),
            queue_group: queue_group.into(),
        }
    }

    /// Run until shutdown or until the subscription ends.
    ///
    /// On shutdown the subscription is closed, messages already buffered are
    /// still answered, and in-flight requests finish before this returns.
    pub async fn run(self, shutdown: ShutdownCoordinator) -> Result<()> {
        let subject = format!("{}.>", self.prefix);
        let mut stream = self
            .broker
            .queue_subscribe(&subject, &self.queue_group)
            .await?;

        info!(
            subject = %subject,
            queue_group = %self.queue_group,
            "Products RPC server started"
        );

        let mut tasks = JoinSet::new();
        let mut closed = false;

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                message = stream.next() => match message {
                    Some(message) => self.spawn(&mut tasks, message),
                    None => {
                        warn!("Subscription ended");
                        closed = true;
                        break;
                    }
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_join(joined);
                }
            }
        }

        if !closed {
            self.drain(stream, &mut tasks).await?;
        }

        while let Some(joined) = tasks.join_next().await {
            log_join(joined);
        }

        self.broker.flush().await?;
        info!("Products RPC server stopped");
        Ok(())
    }

    async fn drain(
        &self,
        mut stream: Box<dyn MessageStream>,
        tasks: &mut JoinSet<()>,
    ) -> Result<()> {
        stream.close().await?;

        let mut drained = 0usize;
        while let Ok(Some(message)) = tokio::time::timeout(DRAIN_POLL, stream.next()).await {
            self.spawn(tasks, message);
            drained += 1;
        }

        debug!(drained, in_flight = tasks.len(), "Subscription drained");
        Ok(())
    }

    fn spawn(&self, tasks: &mut JoinSet<()>, message: ReceivedMessage) {
        let broker = Arc::clone(&self.broker);
        let service = self.service.clone();
        let pattern = pattern_of(&self.prefix, &message.subject).to_string();

        tasks.spawn(async move {
            handle_message(broker.as_ref(), &service, &pattern, message).await;
        });
    }
}

/// Pattern part of `subject`; subjects outside the prefix are used whole
fn pattern_of<'a>(prefix: &str, subject: &'a str) -> &'a str {
    subject
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(subject)
}

#[instrument(skip(broker, service, message), fields(subject = %message.subject))]
async fn handle_message<B, R>(
    broker: &B,
    service: &ProductService<R>,
    pattern: &str,
    message: ReceivedMessage,
) where
    B: MessageBroker,
    R: ProductRepository,
{
    let Some(reply_to) = message.reply else {
        warn!(pattern, "Dropping message without reply subject");
        return;
    };

    let reply = dispatch(service, pattern, &message.payload).await;

    if let Err(e) = broker.publish_raw(&reply_to, &reply).await {
        error!(pattern, error = %e, "Failed to publish reply");
    }
}

fn log_join(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "Request task failed");
    }
}
