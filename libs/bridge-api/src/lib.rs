pub mod error;

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use error::{BrokerError, BrokerErrorKind};

/// Boxed future returned by every broker capability method.
pub type BrokerFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BrokerError>> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  Topic types
// ════════════════════════════════════════════════════════════════

/// Where a consumer group seen for the first time starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    #[default]
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

/// Parameters of a topic creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSpec {
    pub name: String,
    pub partitions: i32,
    pub replication: i32,
}

/// Why the broker refused to create one topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateRejection {
    /// The topic exists already, possibly created by another client.
    AlreadyExists,
    /// Any other refusal, with the broker's reason.
    Failed(String),
}

impl std::fmt::Display for CreateRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreateRejection::AlreadyExists => f.write_str("topic already exists"),
            CreateRejection::Failed(reason) => f.write_str(reason),
        }
    }
}

/// Per-topic outcome reported by the broker for a creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicCreation {
    pub topic: String,
    pub outcome: Result<(), CreateRejection>,
}

impl std::fmt::Display for TopicCreation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            Ok(()) => write!(f, "{} (created)", self.topic),
            Err(reason) => write!(f, "{} ({reason})", self.topic),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  Broker capability
// ════════════════════════════════════════════════════════════════

/// Administrative session. Closed when dropped.
pub trait BrokerAdmin: Send + Sync {
    /// Every topic name in the cluster metadata.
    fn list_topics(&self, timeout: Duration) -> BrokerFuture<'_, BTreeSet<String>>;

    /// Request creation of `specs`. A request-level failure is an `Err`;
    /// per-topic failures are reported inside the returned results.
    fn create_topics<'a>(
        &'a self,
        specs: &'a [TopicSpec],
        timeout: Duration,
    ) -> BrokerFuture<'a, Vec<TopicCreation>>;
}

/// Consumer session bound to one group and one topic.
pub trait BrokerConsumer: Send {
    /// Next message payload. `timeout = None` waits indefinitely;
    /// `Ok(None)` means the timeout elapsed without a message.
    fn recv(&mut self, timeout: Option<Duration>) -> BrokerFuture<'_, Option<Vec<u8>>>;
}

/// Producer session.
pub trait BrokerProducer: Send + Sync {
    /// Wait (bounded) for previously submitted records to leave the client.
    fn flush(&self, timeout: Duration) -> BrokerFuture<'_, ()>;

    /// Submit `payload` to `topic` with automatic partition assignment.
    /// Returns once the client has accepted the record; delivery is not awaited.
    fn send<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BrokerFuture<'a, ()>;
}

/// Factory for broker sessions. Implementations: Kafka (`broker-kafka`),
/// in-memory (`topic_engine::MemoryBroker`).
pub trait Broker: Send + Sync {
    fn admin(&self) -> Result<Box<dyn BrokerAdmin>, BrokerError>;

    fn consumer(
        &self,
        group_id: &str,
        topic: &str,
        offset_reset: OffsetReset,
    ) -> Result<Box<dyn BrokerConsumer>, BrokerError>;

    fn producer(&self) -> Result<Box<dyn BrokerProducer>, BrokerError>;
}
