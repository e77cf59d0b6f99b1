use bridge_api::BrokerError;

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("secret key must be 16, 24 or 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("topic '{0}' does not exist")]
    TopicNotFound(String),

    #[error("topic '{0}' already exists")]
    TopicAlreadyExists(String),

    #[error("no channel for topic '{0}'")]
    NoChannel(String),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    /// Broker metadata is unreachable. Fatal at start-up.
    #[error("admin connection failed: {0}")]
    AdminConnectionFailed(#[source] BrokerError),

    #[error("consumer for topic '{topic}' failed: {source}")]
    ConsumerFailed { topic: String, source: BrokerError },

    #[error("publish to topic '{topic}' failed: {source}")]
    PublishFailed { topic: String, source: BrokerError },

    #[error("create topic '{topic}' failed: {detail}")]
    CreateFailed { topic: String, detail: String },
}
