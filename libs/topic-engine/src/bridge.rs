use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::BridgeContext;
use crate::consumer::TopicConsumer;
use crate::directory::TopicDirectory;
use crate::error::EngineError;
use crate::registry::ChannelRegistry;
use crate::slot::slot;

/// Running bridge: one consumption loop per topic discovered at start-up,
/// plus the frozen registry the HTTP side reads from.
///
/// Topics created after `start` are not picked up.
pub struct Bridge {
    ctx: Arc<BridgeContext>,
    registry: Arc<ChannelRegistry>,
    handles: Vec<JoinHandle<()>>,
    token: CancellationToken,
}

impl Bridge {
    /// Discover topics, subscribe to each non-reserved one, then register
    /// its slot and spawn its consumption loop.
    ///
    /// Admin-path and consumer-session failures abort start-up and stop any
    /// loop already spawned. A topic that disappears between discovery and
    /// subscription is skipped and gets no channel.
    pub async fn start(ctx: Arc<BridgeContext>, token: CancellationToken) -> Result<Self, EngineError> {
        let topics = TopicDirectory::new(ctx.clone()).list_topics().await?;
        tracing::info!(topics = ?topics, "discovered topics");

        let mut registry = ChannelRegistry::new();
        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        for topic in topics {
            if ctx.config.is_reserved(&topic) {
                tracing::debug!(topic = %topic, "skipping reserved topic");
                continue;
            }

            let consumer = match TopicConsumer::new(ctx.clone(), topic.clone()).subscribe().await {
                Ok(consumer) => consumer,
                Err(EngineError::TopicNotFound(_)) => {
                    tracing::warn!(topic = %topic, "topic vanished before subscribe, skipping");
                    continue;
                }
                Err(e) => {
                    tracing::error!(topic = %topic, error = %e, "consumer failed to start");
                    for handle in &handles {
                        handle.abort();
                    }
                    return Err(e);
                }
            };

            let (sender, receiver) = slot();
            registry.register(topic, receiver);
            handles.push(consumer.spawn(sender, token.clone()));
        }

        tracing::info!(channels = registry.len(), "bridge started");

        Ok(Self {
            ctx,
            registry: Arc::new(registry),
            handles,
            token,
        })
    }

    pub fn registry(&self) -> Arc<ChannelRegistry> {
        self.registry.clone()
    }

    /// Number of consumption loops still running.
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Cancel every loop, wait up to the grace period, abort stragglers.
    pub async fn shutdown(self) {
        self.token.cancel();

        let deadline = tokio::time::Instant::now() + self.ctx.config.shutdown_grace;
        let mut aborted = 0usize;
        for mut handle in self.handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                let _ = handle.await;
                aborted += 1;
            }
        }

        if aborted > 0 {
            tracing::warn!(aborted, "consumers did not stop within grace period");
        }
        tracing::info!("bridge stopped");
    }
}
