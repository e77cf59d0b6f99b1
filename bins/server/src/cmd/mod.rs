pub mod serve;
pub mod topics;

use std::sync::Arc;

use bridge_api::Broker;
use broker_kafka::KafkaBroker;
use topic_engine::{BridgeContext, Cipher, MemoryBroker};

use crate::config::{BrokerKind, Effective};
use crate::error::ServerError;

/// Broker and cipher from the merged config. The key is checked here, so a
/// bad key fails before anything touches the broker.
pub(crate) fn build_context(eff: &Effective) -> Result<Arc<BridgeContext>, ServerError> {
    let cipher = Cipher::new(eff.secret_key.as_bytes())?;

    let broker: Arc<dyn Broker> = match eff.broker {
        BrokerKind::Kafka => Arc::new(KafkaBroker::new(eff.kafka.clone())),
        BrokerKind::Memory => Arc::new(MemoryBroker::with_topics(eff.memory_topics.iter().cloned())),
    };
    tracing::info!(broker = ?eff.broker, brokers = %eff.kafka.brokers, "broker configured");

    Ok(BridgeContext::new(eff.engine.clone(), broker, cipher))
}

/// Push out anything the shared producer still buffers.
pub(crate) async fn flush_producer(ctx: &BridgeContext) {
    let grace = ctx.config.shutdown_grace;
    let flushed = match ctx.broker.producer() {
        Ok(producer) => producer.flush(grace).await,
        Err(e) => Err(e),
    };
    if let Err(e) = flushed {
        tracing::warn!(error = %e, "producer flush failed");
    }
}
