use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use bridge_api::BrokerConsumer;

use crate::BridgeContext;
use crate::directory::TopicDirectory;
use crate::error::EngineError;
use crate::slot::SlotSender;

// ═══════════════════════════════════════════════════════════════
//  Consumption loop: broker → decrypt → slot
// ═══════════════════════════════════════════════════════════════

/// Background consumer of one topic, before it has subscribed.
pub struct TopicConsumer {
    ctx: Arc<BridgeContext>,
    topic: String,
}

/// A consumer session bound to its topic, ready to run.
pub struct SubscribedConsumer {
    ctx: Arc<BridgeContext>,
    topic: String,
    session: Box<dyn BrokerConsumer>,
}

impl TopicConsumer {
    pub fn new(ctx: Arc<BridgeContext>, topic: impl Into<String>) -> Self {
        Self { ctx, topic: topic.into() }
    }

    /// Check the topic exists and open a consumer session in the configured
    /// group. Nothing is spawned if either step fails.
    pub async fn subscribe(self) -> Result<SubscribedConsumer, EngineError> {
        let directory = TopicDirectory::new(self.ctx.clone());
        if !directory.exists(&self.topic).await? {
            return Err(EngineError::TopicNotFound(self.topic));
        }

        let config = &self.ctx.config;
        let session = self
            .ctx
            .broker
            .consumer(&config.group_id, &self.topic, config.offset_reset)
            .map_err(|source| EngineError::ConsumerFailed { topic: self.topic.clone(), source })?;
        tracing::info!(
            topic = %self.topic,
            group = %config.group_id,
            offset_reset = config.offset_reset.as_str(),
            "subscribed"
        );

        Ok(SubscribedConsumer {
            ctx: self.ctx,
            topic: self.topic,
            session,
        })
    }
}

impl SubscribedConsumer {
    /// Run the read loop on its own task until `token` is cancelled or the
    /// slot's receiver goes away.
    pub fn spawn(self, sender: SlotSender<String>, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(sender, token))
    }

    async fn run(mut self, mut sender: SlotSender<String>, token: CancellationToken) {
        loop {
            tracing::debug!(topic = %self.topic, "waiting for message");
            let read = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                read = self.session.recv(None) => read,
            };

            let payload = match read {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(topic = %self.topic, error = %e, "read from broker failed");
                    continue;
                }
            };

            let message = match self.ctx.cipher.decrypt(&payload) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(topic = %self.topic, error = %e, "dropping undecryptable message");
                    continue;
                }
            };

            // The next broker read waits until this message is collected.
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                sent = sender.send(message) => {
                    if sent.is_err() {
                        tracing::info!(topic = %self.topic, "channel closed");
                        break;
                    }
                }
            }
            tracing::debug!(topic = %self.topic, "message collected");
        }
        tracing::info!(topic = %self.topic, "consumer stopped");
    }
}
