use std::time::Duration;

use bridge_api::OffsetReset;

/// Broker bookkeeping topic, never consumed.
pub const CONSUMER_OFFSETS_TOPIC: &str = "__consumer_offsets";

/// Bridge settings. Built once at start-up and shared read-only.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Consumer group every consumption loop joins.
    pub group_id: String,
    /// Where a group seen for the first time starts reading.
    pub offset_reset: OffsetReset,
    /// Topics excluded from the channel registry.
    pub reserved_topics: Vec<String>,
    /// Bound for one cluster metadata request.
    pub metadata_timeout: Duration,
    /// Bound for the producer flush before each publish.
    pub flush_timeout: Duration,
    /// Bound for the admin create-topic operation.
    pub create_timeout: Duration,
    /// How long shutdown waits for consumption loops before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            group_id: "myGroup".into(),
            offset_reset: OffsetReset::Earliest,
            reserved_topics: vec![CONSUMER_OFFSETS_TOPIC.into()],
            metadata_timeout: Duration::from_secs(5),
            flush_timeout: Duration::from_millis(200),
            create_timeout: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    pub fn is_reserved(&self, topic: &str) -> bool {
        self.reserved_topics.iter().any(|t| t == topic)
    }
}
