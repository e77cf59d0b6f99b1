use std::collections::HashMap;

use crate::error::EngineError;
use crate::slot::SlotReceiver;

/// Topic name → receiving half of that topic's slot.
///
/// Filled once at start-up, then frozen behind an `Arc`. Lookups need no
/// lock; each slot guards its own value.
#[derive(Default)]
pub struct ChannelRegistry {
    slots: HashMap<String, SlotReceiver<String>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, topic: String, receiver: SlotReceiver<String>) {
        self.slots.insert(topic, receiver);
    }

    /// Non-blocking read of the topic's pending message.
    ///
    /// `Ok(None)` when nothing is waiting, `Err(NoChannel)` when the topic
    /// was never registered.
    pub fn poll(&self, topic: &str) -> Result<Option<String>, EngineError> {
        self.slots
            .get(topic)
            .map(SlotReceiver::try_recv)
            .ok_or_else(|| EngineError::NoChannel(topic.to_string()))
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.slots.contains_key(topic)
    }

    /// Registered topic names, sorted.
    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::slot;

    #[tokio::test]
    async fn poll_distinguishes_empty_from_unregistered() {
        let (mut tx, rx) = slot();
        let mut registry = ChannelRegistry::new();
        registry.register("orders".into(), rx);

        assert!(matches!(registry.poll("orders"), Ok(None)));
        assert!(matches!(registry.poll("payments"), Err(EngineError::NoChannel(t)) if t == "payments"));

        let writer = tokio::spawn(async move { tx.send("hello".to_string()).await });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert_eq!(registry.poll("orders").unwrap().as_deref(), Some("hello"));
        assert!(matches!(registry.poll("orders"), Ok(None)));
        assert!(writer.await.unwrap().is_ok());
    }

    #[test]
    fn topics_are_sorted() {
        let mut registry = ChannelRegistry::new();
        for name in ["b", "a", "c"] {
            let (_tx, rx) = slot();
            registry.register(name.into(), rx);
        }
        assert_eq!(registry.topics(), ["a", "b", "c"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("a"));
    }
}
