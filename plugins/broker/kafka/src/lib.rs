use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;

use bridge_api::{
    Broker, BrokerAdmin, BrokerConsumer, BrokerError, BrokerFuture, BrokerProducer,
    CreateRejection, OffsetReset, TopicCreation, TopicSpec,
};

// ═══════════════════════════════════════════════════════════════
//  KafkaConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct KafkaConfig {
    /// `bootstrap.servers`, comma separated.
    pub brokers: String,
    /// Extra librdkafka properties applied to every client.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

// ═══════════════════════════════════════════════════════════════
//  KafkaBroker
// ═══════════════════════════════════════════════════════════════

/// Kafka via librdkafka.
///
/// Admin and consumer sessions are separate clients. Producer sessions
/// share one `FutureProducer`, so a record accepted by a session is still
/// delivered after the session is dropped.
pub struct KafkaBroker {
    config: KafkaConfig,
    producer: Mutex<Option<FutureProducer>>,
}

impl KafkaBroker {
    pub fn new(config: KafkaConfig) -> Self {
        Self {
            config,
            producer: Mutex::new(None),
        }
    }

    fn client_config(&self) -> ClientConfig {
        let mut cfg = ClientConfig::new();
        cfg.set("bootstrap.servers", &self.config.brokers);
        for (key, value) in &self.config.properties {
            cfg.set(key, value);
        }
        cfg
    }

    fn shared_producer(&self) -> Result<FutureProducer, BrokerError> {
        let mut slot = self.producer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(producer) = slot.as_ref() {
            return Ok(producer.clone());
        }
        let producer: FutureProducer = self
            .client_config()
            .create()
            .map_err(|e| BrokerError::connection(format!("create producer: {e}")))?;
        tracing::info!(brokers = %self.config.brokers, "kafka producer created");
        *slot = Some(producer.clone());
        Ok(producer)
    }
}

impl Broker for KafkaBroker {
    fn admin(&self) -> Result<Box<dyn BrokerAdmin>, BrokerError> {
        let client: AdminClient<DefaultClientContext> = self
            .client_config()
            .create()
            .map_err(|e| BrokerError::connection(format!("create admin client: {e}")))?;
        Ok(Box::new(KafkaAdmin { client: Arc::new(client) }))
    }

    fn consumer(
        &self,
        group_id: &str,
        topic: &str,
        offset_reset: OffsetReset,
    ) -> Result<Box<dyn BrokerConsumer>, BrokerError> {
        let consumer: StreamConsumer = self
            .client_config()
            .set("group.id", group_id)
            .set("auto.offset.reset", offset_reset.as_str())
            .create()
            .map_err(|e| BrokerError::connection(format!("create consumer: {e}")))?;
        consumer
            .subscribe(&[topic])
            .map_err(|e| BrokerError::connection(format!("subscribe '{topic}': {e}")))?;
        Ok(Box::new(KafkaConsumer {
            consumer,
            topic: topic.to_string(),
        }))
    }

    fn producer(&self) -> Result<Box<dyn BrokerProducer>, BrokerError> {
        Ok(Box::new(KafkaProducer { producer: self.shared_producer()? }))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Admin
// ═══════════════════════════════════════════════════════════════

struct KafkaAdmin {
    client: Arc<AdminClient<DefaultClientContext>>,
}

impl BrokerAdmin for KafkaAdmin {
    fn list_topics(&self, timeout: Duration) -> BrokerFuture<'_, BTreeSet<String>> {
        let client = self.client.clone();
        Box::pin(async move {
            // fetch_metadata blocks the calling thread.
            tokio::task::spawn_blocking(move || {
                client.inner().fetch_metadata(None, timeout).map(|metadata| {
                    metadata
                        .topics()
                        .iter()
                        .map(|t| t.name().to_string())
                        .collect::<BTreeSet<String>>()
                })
            })
            .await
            .map_err(|e| BrokerError::metadata(format!("metadata task: {e}")))?
            .map_err(|e| BrokerError::metadata(e.to_string()))
        })
    }

    fn create_topics<'a>(
        &'a self,
        specs: &'a [TopicSpec],
        timeout: Duration,
    ) -> BrokerFuture<'a, Vec<TopicCreation>> {
        Box::pin(async move {
            let new_topics: Vec<NewTopic<'_>> = specs
                .iter()
                .map(|s| NewTopic::new(&s.name, s.partitions, TopicReplication::Fixed(s.replication)))
                .collect();
            let opts = AdminOptions::new().operation_timeout(Some(timeout));

            let results = self
                .client
                .create_topics(&new_topics, &opts)
                .await
                .map_err(|e| BrokerError::admin(e.to_string()))?;

            Ok(results.into_iter().map(creation).collect())
        })
    }
}

fn creation(result: TopicResult) -> TopicCreation {
    match result {
        Ok(topic) => TopicCreation { topic, outcome: Ok(()) },
        Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
            TopicCreation { topic, outcome: Err(CreateRejection::AlreadyExists) }
        }
        Err((topic, code)) => {
            TopicCreation { topic, outcome: Err(CreateRejection::Failed(code.to_string())) }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Consumer
// ═══════════════════════════════════════════════════════════════

struct KafkaConsumer {
    consumer: StreamConsumer,
    topic: String,
}

impl BrokerConsumer for KafkaConsumer {
    fn recv(&mut self, timeout: Option<Duration>) -> BrokerFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            let next = async {
                self.consumer
                    .recv()
                    .await
                    .map(|msg| msg.payload().map(<[u8]>::to_vec).unwrap_or_default())
                    .map_err(|e| BrokerError::read(format!("read '{}': {e}", self.topic)))
            };
            match timeout {
                None => next.await.map(Some),
                Some(t) => match tokio::time::timeout(t, next).await {
                    Ok(read) => read.map(Some),
                    Err(_) => Ok(None),
                },
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Producer
// ═══════════════════════════════════════════════════════════════

struct KafkaProducer {
    producer: FutureProducer,
}

impl BrokerProducer for KafkaProducer {
    fn flush(&self, timeout: Duration) -> BrokerFuture<'_, ()> {
        let producer = self.producer.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || producer.flush(timeout))
                .await
                .map_err(|e| BrokerError::publish(format!("flush task: {e}")))?
                .map_err(|e| BrokerError::publish(format!("flush: {e}")))
        })
    }

    fn send<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BrokerFuture<'a, ()> {
        Box::pin(async move {
            let record = FutureRecord::<(), [u8]>::to(topic).payload(payload.as_slice());
            // The delivery future is dropped: accepted by the client is enough.
            match self.producer.send_result(record) {
                Ok(_delivery) => Ok(()),
                Err((e, _)) => Err(BrokerError::publish(e.to_string())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_are_applied_after_bootstrap() {
        let broker = KafkaBroker::new(KafkaConfig {
            brokers: "kafka-1:9092,kafka-2:9092".into(),
            properties: BTreeMap::from([
                ("security.protocol".to_string(), "ssl".to_string()),
                ("client.id".to_string(), "bridge".to_string()),
            ]),
        });
        let cfg = broker.client_config();
        assert_eq!(cfg.get("bootstrap.servers"), Some("kafka-1:9092,kafka-2:9092"));
        assert_eq!(cfg.get("security.protocol"), Some("ssl"));
        assert_eq!(cfg.get("client.id"), Some("bridge"));
    }

    #[test]
    fn already_exists_is_told_apart_from_other_refusals() {
        let exists = creation(Err(("orders".into(), RDKafkaErrorCode::TopicAlreadyExists)));
        assert_eq!(exists.outcome, Err(CreateRejection::AlreadyExists));

        let invalid = creation(Err(("bad name".into(), RDKafkaErrorCode::InvalidTopic)));
        assert!(matches!(invalid.outcome, Err(CreateRejection::Failed(_))));

        assert_eq!(creation(Ok("payments".into())).outcome, Ok(()));
    }

    #[test]
    fn config_deserializes_with_default_properties() {
        let cfg: KafkaConfig = serde_json::from_str(r#"{"brokers": "localhost:9092"}"#).unwrap();
        assert_eq!(cfg.brokers, "localhost:9092");
        assert!(cfg.properties.is_empty());
    }
}
