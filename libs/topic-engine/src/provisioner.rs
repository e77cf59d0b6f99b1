use std::sync::Arc;

use bridge_api::{CreateRejection, TopicCreation, TopicSpec};

use crate::BridgeContext;
use crate::directory::TopicDirectory;
use crate::error::EngineError;

pub const TOPIC_PARTITIONS: i32 = 1;
pub const TOPIC_REPLICATION: i32 = 1;

/// Creates topics that do not exist yet.
#[derive(Clone)]
pub struct TopicProvisioner {
    ctx: Arc<BridgeContext>,
    directory: TopicDirectory,
}

impl TopicProvisioner {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        let directory = TopicDirectory::new(ctx.clone());
        Self { ctx, directory }
    }

    /// Create `topic` with one partition and replication factor one.
    ///
    /// Returns the broker's per-topic results. A failure for the requested
    /// topic is an error; losing a creation race to another client is
    /// `TopicAlreadyExists`, same as the up-front check.
    pub async fn create_topic(&self, topic: &str) -> Result<Vec<TopicCreation>, EngineError> {
        if self.directory.exists(topic).await? {
            return Err(EngineError::TopicAlreadyExists(topic.to_string()));
        }

        let admin = self
            .ctx
            .broker
            .admin()
            .map_err(EngineError::AdminConnectionFailed)?;
        let specs = [TopicSpec {
            name: topic.to_string(),
            partitions: TOPIC_PARTITIONS,
            replication: TOPIC_REPLICATION,
        }];
        let results = admin
            .create_topics(&specs, self.ctx.config.create_timeout)
            .await
            .map_err(|e| EngineError::CreateFailed { topic: topic.to_string(), detail: e.to_string() })?;

        for result in &results {
            tracing::info!(result = %result, "topic creation result");
        }

        match results.iter().find(|r| r.topic == topic) {
            Some(TopicCreation { outcome: Err(CreateRejection::AlreadyExists), .. }) => {
                Err(EngineError::TopicAlreadyExists(topic.to_string()))
            }
            Some(TopicCreation { outcome: Err(CreateRejection::Failed(reason)), .. }) => {
                Err(EngineError::CreateFailed { topic: topic.to_string(), detail: reason.clone() })
            }
            Some(_) => Ok(results),
            None => Err(EngineError::CreateFailed {
                topic: topic.to_string(),
                detail: "broker returned no result for topic".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Duration;

    use bridge_api::{
        Broker, BrokerAdmin, BrokerConsumer, BrokerError, BrokerFuture, BrokerProducer, OffsetReset,
    };

    use super::*;
    use crate::test_support::{KEY, context};
    use crate::{Cipher, EngineConfig, MemoryBroker};

    #[tokio::test]
    async fn existing_topic_never_reaches_create() {
        let broker = MemoryBroker::with_topics(["orders"]);
        let provisioner = TopicProvisioner::new(context(&broker));

        let err = provisioner.create_topic("orders").await.unwrap_err();
        assert!(matches!(err, EngineError::TopicAlreadyExists(t) if t == "orders"));
        assert_eq!(broker.create_requests(), 0);
    }

    #[tokio::test]
    async fn creates_missing_topic() {
        let broker = MemoryBroker::with_topics(["orders"]);
        let ctx = context(&broker);
        let provisioner = TopicProvisioner::new(ctx.clone());

        let results = provisioner.create_topic("payments").await.unwrap();
        assert_eq!(results, vec![TopicCreation { topic: "payments".into(), outcome: Ok(()) }]);
        assert_eq!(broker.create_requests(), 1);
        assert!(TopicDirectory::new(ctx).exists("payments").await.unwrap());
    }

    /// Lists no topics, so the up-front check always passes.
    struct StaleListing {
        inner: MemoryBroker,
    }

    struct StaleAdmin {
        inner: Box<dyn BrokerAdmin>,
    }

    impl BrokerAdmin for StaleAdmin {
        fn list_topics(&self, _timeout: Duration) -> BrokerFuture<'_, BTreeSet<String>> {
            Box::pin(async { Ok(BTreeSet::new()) })
        }

        fn create_topics<'a>(
            &'a self,
            specs: &'a [TopicSpec],
            timeout: Duration,
        ) -> BrokerFuture<'a, Vec<TopicCreation>> {
            self.inner.create_topics(specs, timeout)
        }
    }

    impl Broker for StaleListing {
        fn admin(&self) -> Result<Box<dyn BrokerAdmin>, BrokerError> {
            Ok(Box::new(StaleAdmin { inner: self.inner.admin()? }))
        }

        fn consumer(
            &self,
            group_id: &str,
            topic: &str,
            offset_reset: OffsetReset,
        ) -> Result<Box<dyn BrokerConsumer>, BrokerError> {
            self.inner.consumer(group_id, topic, offset_reset)
        }

        fn producer(&self) -> Result<Box<dyn BrokerProducer>, BrokerError> {
            self.inner.producer()
        }
    }

    #[tokio::test]
    async fn topic_created_concurrently_is_already_exists() {
        let broker = MemoryBroker::with_topics(["orders"]);
        let ctx = BridgeContext::new(
            EngineConfig::default(),
            Arc::new(StaleListing { inner: broker.clone() }),
            Cipher::new(KEY).unwrap(),
        );

        let err = TopicProvisioner::new(ctx).create_topic("orders").await.unwrap_err();
        assert!(matches!(err, EngineError::TopicAlreadyExists(t) if t == "orders"));
        assert_eq!(broker.create_requests(), 1);
    }
}
