use std::collections::BTreeSet;
use std::sync::Arc;

use crate::BridgeContext;
use crate::error::EngineError;

/// Live view of the broker's topic set.
///
/// Every call opens one admin session, fetches full cluster metadata and
/// closes the session again. Nothing is cached, so each answer is fresh
/// and each call costs a metadata round trip.
#[derive(Clone)]
pub struct TopicDirectory {
    ctx: Arc<BridgeContext>,
}

impl TopicDirectory {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        Self { ctx }
    }

    pub async fn list_topics(&self) -> Result<BTreeSet<String>, EngineError> {
        let admin = self
            .ctx
            .broker
            .admin()
            .map_err(EngineError::AdminConnectionFailed)?;
        let topics = admin
            .list_topics(self.ctx.config.metadata_timeout)
            .await
            .map_err(|e| EngineError::AdminConnectionFailed(e.with_context("fetch metadata")))?;
        tracing::debug!(count = topics.len(), "fetched topic metadata");
        Ok(topics)
    }

    pub async fn exists(&self, topic: &str) -> Result<bool, EngineError> {
        Ok(self.list_topics().await?.contains(topic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBroker;
    use crate::test_support::context;

    #[tokio::test]
    async fn existence_is_queried_live() {
        let broker = MemoryBroker::with_topics(["orders"]);
        let directory = TopicDirectory::new(context(&broker));

        assert!(directory.exists("orders").await.unwrap());
        assert!(!directory.exists("payments").await.unwrap());

        broker.add_topic("payments");
        assert!(directory.exists("payments").await.unwrap());
        assert_eq!(broker.admin_sessions(), 3);
    }

    #[tokio::test]
    async fn unreachable_admin_is_reported() {
        let broker = MemoryBroker::with_topics(["orders"]);
        broker.set_admin_available(false);
        let directory = TopicDirectory::new(context(&broker));

        let err = directory.list_topics().await.unwrap_err();
        assert!(matches!(err, EngineError::AdminConnectionFailed(_)));
    }
}
