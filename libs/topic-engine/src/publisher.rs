use std::sync::Arc;

use crate::BridgeContext;
use crate::directory::TopicDirectory;
use crate::error::EngineError;

/// Encrypts and publishes messages to existing topics.
#[derive(Clone)]
pub struct MessagePublisher {
    ctx: Arc<BridgeContext>,
    directory: TopicDirectory,
}

impl MessagePublisher {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        let directory = TopicDirectory::new(ctx.clone());
        Self { ctx, directory }
    }

    /// Publish `plaintext` to `topic`.
    ///
    /// The producer path is not touched unless the topic exists. Returns as
    /// soon as the broker client accepted the record.
    pub async fn publish(&self, topic: &str, plaintext: &str) -> Result<(), EngineError> {
        if !self.directory.exists(topic).await? {
            return Err(EngineError::TopicNotFound(topic.to_string()));
        }

        let wire = self.ctx.cipher.encrypt(plaintext);

        let producer = self
            .ctx
            .broker
            .producer()
            .map_err(|source| EngineError::PublishFailed { topic: topic.to_string(), source })?;

        if let Err(e) = producer.flush(self.ctx.config.flush_timeout).await {
            tracing::debug!(topic = %topic, error = %e, "producer flush incomplete");
        }

        producer
            .send(topic, wire.into_bytes())
            .await
            .map_err(|source| EngineError::PublishFailed { topic: topic.to_string(), source })?;

        tracing::info!(topic = %topic, "message sent");
        Ok(())
    }
}
