#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config ({context}): {detail}")]
    Config { context: &'static str, detail: String },

    #[error("secret key: {0}")]
    Cipher(#[from] topic_engine::CipherError),

    #[error("{0}")]
    Engine(#[from] topic_engine::EngineError),

    #[error("broker: {0}")]
    Broker(#[from] bridge_api::BrokerError),

    #[error("api server: {0}")]
    Api(String),

    #[error("signal: {0}")]
    Signal(#[from] std::io::Error),
}
