pub mod bridge;
pub mod cipher;
pub mod config;
pub mod consumer;
pub mod directory;
pub mod error;
pub mod memory;
pub mod provisioner;
pub mod publisher;
pub mod registry;
pub mod slot;

use std::sync::Arc;

use bridge_api::Broker;

pub use bridge::Bridge;
pub use cipher::Cipher;
pub use config::EngineConfig;
pub use consumer::{SubscribedConsumer, TopicConsumer};
pub use directory::TopicDirectory;
pub use error::{CipherError, EngineError};
pub use memory::MemoryBroker;
pub use provisioner::TopicProvisioner;
pub use publisher::MessagePublisher;
pub use registry::ChannelRegistry;

// ═══════════════════════════════════════════════════════════════
//  BridgeContext
// ═══════════════════════════════════════════════════════════════

/// Everything the bridge components share: settings, the broker and the
/// cipher. Constructed once before any task starts, then only read.
pub struct BridgeContext {
    pub config: EngineConfig,
    pub broker: Arc<dyn Broker>,
    pub cipher: Cipher,
}

impl BridgeContext {
    pub fn new(config: EngineConfig, broker: Arc<dyn Broker>, cipher: Cipher) -> Arc<Self> {
        Arc::new(Self { config, broker, cipher })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    pub const KEY: &[u8] = b"0123456789abcdef";

    pub fn context(broker: &MemoryBroker) -> Arc<BridgeContext> {
        let config = EngineConfig {
            shutdown_grace: Duration::from_millis(200),
            ..EngineConfig::default()
        };
        BridgeContext::new(config, Arc::new(broker.clone()), Cipher::new(KEY).unwrap())
    }

    /// Poll until a message shows up (the loop runs on its own task).
    pub async fn wait_message(registry: &ChannelRegistry, topic: &str) -> String {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(msg) = registry.poll(topic).unwrap() {
                    return msg;
                }
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("no message within 2s")
    }
}
