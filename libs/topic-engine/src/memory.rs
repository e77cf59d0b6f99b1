use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;

use bridge_api::{
    Broker, BrokerAdmin, BrokerConsumer, BrokerError, BrokerFuture, BrokerProducer,
    CreateRejection, OffsetReset, TopicCreation, TopicSpec,
};

// ═══════════════════════════════════════════════════════════════
//  Shared state
// ═══════════════════════════════════════════════════════════════

#[derive(Default)]
struct State {
    /// Append-only log per topic.
    topics: BTreeMap<String, Vec<Vec<u8>>>,
    /// Next offset per (group, topic). Committed on every read.
    offsets: HashMap<(String, String), usize>,
    admin_unavailable: bool,
    /// Reads left to fail per topic, across every group.
    read_failures: HashMap<String, usize>,
}

#[derive(Default)]
struct Counters {
    admin_sessions: AtomicUsize,
    consumer_sessions: AtomicUsize,
    producer_sessions: AtomicUsize,
    create_requests: AtomicUsize,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    appended: Notify,
    counters: Counters,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn append(&self, topic: &str, payload: Vec<u8>) -> bool {
        {
            let mut state = self.state();
            match state.topics.get_mut(topic) {
                Some(log) => log.push(payload),
                None => return false,
            }
        }
        self.appended.notify_waiters();
        true
    }
}

// ═══════════════════════════════════════════════════════════════
//  MemoryBroker
// ═══════════════════════════════════════════════════════════════

/// In-process broker: topics are append-only logs, consumer groups keep
/// committed offsets. Used for tests and for running without Kafka.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    shared: Arc<Shared>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topics<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let broker = Self::new();
        for topic in topics {
            broker.add_topic(topic);
        }
        broker
    }

    /// Create a topic out of band. No-op if it exists.
    pub fn add_topic(&self, topic: impl Into<String>) {
        self.shared.state().topics.entry(topic.into()).or_default();
    }

    /// Append a raw payload, as an external producer would.
    /// Returns `false` if the topic does not exist.
    pub fn append(&self, topic: &str, payload: impl Into<Vec<u8>>) -> bool {
        self.shared.append(topic, payload.into())
    }

    /// Every raw payload ever appended to `topic`.
    pub fn messages(&self, topic: &str) -> Vec<Vec<u8>> {
        self.shared.state().topics.get(topic).cloned().unwrap_or_default()
    }

    /// Offset `group` will read next from `topic`, if the group has joined.
    pub fn committed_offset(&self, group: &str, topic: &str) -> Option<usize> {
        self.shared
            .state()
            .offsets
            .get(&(group.to_string(), topic.to_string()))
            .copied()
    }

    /// Simulate the admin path going down (or coming back).
    pub fn set_admin_available(&self, available: bool) {
        self.shared.state().admin_unavailable = !available;
    }

    /// Make the next `count` reads from `topic` fail with a read error.
    pub fn fail_reads(&self, topic: &str, count: usize) {
        *self.shared.state().read_failures.entry(topic.to_string()).or_default() += count;
    }

    pub fn admin_sessions(&self) -> usize {
        self.shared.counters.admin_sessions.load(Ordering::Relaxed)
    }

    pub fn consumer_sessions(&self) -> usize {
        self.shared.counters.consumer_sessions.load(Ordering::Relaxed)
    }

    pub fn producer_sessions(&self) -> usize {
        self.shared.counters.producer_sessions.load(Ordering::Relaxed)
    }

    pub fn create_requests(&self) -> usize {
        self.shared.counters.create_requests.load(Ordering::Relaxed)
    }
}

impl Broker for MemoryBroker {
    fn admin(&self) -> Result<Box<dyn BrokerAdmin>, BrokerError> {
        if self.shared.state().admin_unavailable {
            return Err(BrokerError::connection("memory broker: admin path unavailable"));
        }
        self.shared.counters.admin_sessions.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryAdmin { shared: self.shared.clone() }))
    }

    fn consumer(
        &self,
        group_id: &str,
        topic: &str,
        offset_reset: OffsetReset,
    ) -> Result<Box<dyn BrokerConsumer>, BrokerError> {
        {
            let mut state = self.shared.state();
            let start = match offset_reset {
                OffsetReset::Earliest => 0,
                OffsetReset::Latest => state.topics.get(topic).map_or(0, Vec::len),
            };
            state
                .offsets
                .entry((group_id.to_string(), topic.to_string()))
                .or_insert(start);
        }
        self.shared.counters.consumer_sessions.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryConsumer {
            shared: self.shared.clone(),
            key: (group_id.to_string(), topic.to_string()),
        }))
    }

    fn producer(&self) -> Result<Box<dyn BrokerProducer>, BrokerError> {
        self.shared.counters.producer_sessions.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(MemoryProducer { shared: self.shared.clone() }))
    }
}

// ═══════════════════════════════════════════════════════════════
//  Sessions
// ═══════════════════════════════════════════════════════════════

struct MemoryAdmin {
    shared: Arc<Shared>,
}

impl BrokerAdmin for MemoryAdmin {
    fn list_topics(&self, _timeout: Duration) -> BrokerFuture<'_, BTreeSet<String>> {
        Box::pin(async move {
            let state = self.shared.state();
            if state.admin_unavailable {
                return Err(BrokerError::metadata("memory broker: metadata unavailable"));
            }
            Ok(state.topics.keys().cloned().collect())
        })
    }

    fn create_topics<'a>(
        &'a self,
        specs: &'a [TopicSpec],
        _timeout: Duration,
    ) -> BrokerFuture<'a, Vec<TopicCreation>> {
        Box::pin(async move {
            self.shared.counters.create_requests.fetch_add(1, Ordering::Relaxed);
            let mut state = self.shared.state();
            let results = specs
                .iter()
                .map(|spec| {
                    let outcome = if state.topics.contains_key(&spec.name) {
                        Err(CreateRejection::AlreadyExists)
                    } else if spec.partitions < 1 || spec.replication < 1 {
                        Err(CreateRejection::Failed(
                            "invalid partition count or replication factor".into(),
                        ))
                    } else {
                        state.topics.insert(spec.name.clone(), Vec::new());
                        Ok(())
                    };
                    TopicCreation { topic: spec.name.clone(), outcome }
                })
                .collect();
            Ok(results)
        })
    }
}

struct MemoryConsumer {
    shared: Arc<Shared>,
    key: (String, String),
}

impl MemoryConsumer {
    fn take_failure(&self) -> bool {
        let mut state = self.shared.state();
        match state.read_failures.get_mut(&self.key.1) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }

    fn try_next(&self) -> Option<Vec<u8>> {
        let mut state = self.shared.state();
        let State { topics, offsets, .. } = &mut *state;
        let log = topics.get(&self.key.1)?;
        let offset = offsets.entry(self.key.clone()).or_insert(0);
        let payload = log.get(*offset)?.clone();
        *offset += 1;
        Some(payload)
    }
}

impl BrokerConsumer for MemoryConsumer {
    fn recv(&mut self, timeout: Option<Duration>) -> BrokerFuture<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            if self.take_failure() {
                return Err(BrokerError::read(format!("memory broker: read from '{}' failed", self.key.1)));
            }
            let deadline = timeout.map(|t| tokio::time::Instant::now() + t);
            loop {
                let notified = self.shared.appended.notified();
                tokio::pin!(notified);
                // Register before checking so an append in between is not missed.
                notified.as_mut().enable();

                if let Some(payload) = self.try_next() {
                    return Ok(Some(payload));
                }
                match deadline {
                    None => notified.await,
                    Some(deadline) => {
                        if tokio::time::timeout_at(deadline, notified).await.is_err() {
                            return Ok(None);
                        }
                    }
                }
            }
        })
    }
}

struct MemoryProducer {
    shared: Arc<Shared>,
}

impl BrokerProducer for MemoryProducer {
    fn flush(&self, _timeout: Duration) -> BrokerFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn send<'a>(&'a self, topic: &'a str, payload: Vec<u8>) -> BrokerFuture<'a, ()> {
        Box::pin(async move {
            if self.shared.append(topic, payload) {
                Ok(())
            } else {
                Err(BrokerError::publish(format!("unknown topic '{topic}'")))
            }
        })
    }
}
