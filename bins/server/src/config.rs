use std::collections::BTreeMap;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;

use bridge_api::OffsetReset;
use broker_kafka::KafkaConfig;
use topic_engine::EngineConfig;

use crate::error::ServerError;

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Parser)]
#[command(name = "kafka-bridge", about = "HTTP bridge to encrypted Kafka topics")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArgs {
    /// Path to config.toml (optional)
    #[arg(long, global = true, default_value = "config.toml", env = "BRIDGE_CONFIG")]
    pub config: String,

    /// Kafka bootstrap servers, e.g. "localhost:9092"
    #[arg(long, global = true, env = "KAFKA_BROKERS")]
    pub brokers: Option<String>,

    /// AES key: 16, 24 or 32 bytes
    #[arg(long, global = true, env = "SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bridge and its HTTP API
    Serve(ServeArgs),
    /// List topics known to the broker
    Topics,
    /// Create a topic (1 partition, replication factor 1)
    Create { topic: String },
    /// Encrypt and publish one message
    Send { topic: String, message: String },
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// HTTP port
    #[arg(long, env = "BRIDGE_PORT")]
    pub port: Option<u16>,
}

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerKind {
    #[default]
    Kafka,
    /// In-process broker seeded with `memory_topics`. Nothing is persisted.
    Memory,
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub broker: Option<BrokerKind>,
    pub brokers: Option<String>,
    pub secret_key: Option<String>,
    pub api_port: Option<u16>,
    pub group_id: Option<String>,
    pub offset_reset: Option<String>,
    pub reserved_topics: Option<Vec<String>>,
    pub metadata_timeout_ms: Option<u64>,
    pub flush_timeout_ms: Option<u64>,
    pub create_timeout_ms: Option<u64>,
    pub shutdown_grace_ms: Option<u64>,
    #[serde(default)]
    pub memory_topics: Vec<String>,
    #[serde(default)]
    pub kafka: KafkaSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct KafkaSection {
    /// Passed to librdkafka as-is.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl Config {
    pub fn parse(content: &str, path: &str) -> Result<Self, ServerError> {
        toml::from_str(content)
            .map_err(|e| ServerError::Config { context: "parse", detail: format!("'{path}': {e}") })
    }

    pub fn load(path: &str) -> Result<Self, ServerError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config { context: "read", detail: format!("'{path}': {e}") })?;
        Self::parse(&content, path)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

const DEFAULT_API_PORT: u16 = 8080;

/// Final settings: config.toml < env/CLI.
pub struct Effective {
    pub broker: BrokerKind,
    pub kafka: KafkaConfig,
    pub memory_topics: Vec<String>,
    pub secret_key: String,
    pub api_port: u16,
    pub engine: EngineConfig,
}

impl Effective {
    /// A missing config file is fine unless the path exists.
    pub fn new(args: &GlobalArgs, port: Option<u16>) -> Result<Self, ServerError> {
        let cfg = match Config::load(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if std::path::Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, port, cfg)
    }

    pub fn merge(args: &GlobalArgs, port: Option<u16>, cfg: Config) -> Result<Self, ServerError> {
        let broker = cfg.broker.unwrap_or_default();

        let brokers = args.brokers.clone().or(cfg.brokers).unwrap_or_default();
        if broker == BrokerKind::Kafka && brokers.trim().is_empty() {
            return Err(ServerError::Config {
                context: "brokers",
                detail: "set --brokers, KAFKA_BROKERS or `brokers` in config".into(),
            });
        }

        let secret_key = args.secret_key.clone().or(cfg.secret_key).unwrap_or_default();
        if secret_key.is_empty() {
            return Err(ServerError::Config {
                context: "secret_key",
                detail: "set --secret-key, SECRET_KEY or `secret_key` in config".into(),
            });
        }

        let defaults = EngineConfig::default();
        let offset_reset = match cfg.offset_reset.as_deref() {
            None => defaults.offset_reset,
            Some("earliest") => OffsetReset::Earliest,
            Some("latest") => OffsetReset::Latest,
            Some(other) => {
                return Err(ServerError::Config {
                    context: "offset_reset",
                    detail: format!("expected 'earliest' or 'latest', got '{other}'"),
                });
            }
        };
        let millis = |v: Option<u64>, d: Duration| v.map(Duration::from_millis).unwrap_or(d);

        let engine = EngineConfig {
            group_id: cfg.group_id.unwrap_or(defaults.group_id),
            offset_reset,
            reserved_topics: cfg.reserved_topics.unwrap_or(defaults.reserved_topics),
            metadata_timeout: millis(cfg.metadata_timeout_ms, defaults.metadata_timeout),
            flush_timeout: millis(cfg.flush_timeout_ms, defaults.flush_timeout),
            create_timeout: millis(cfg.create_timeout_ms, defaults.create_timeout),
            shutdown_grace: millis(cfg.shutdown_grace_ms, defaults.shutdown_grace),
        };

        Ok(Self {
            broker,
            kafka: KafkaConfig { brokers, properties: cfg.kafka.properties },
            memory_topics: cfg.memory_topics,
            secret_key,
            api_port: port.or(cfg.api_port).unwrap_or(DEFAULT_API_PORT),
            engine,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(brokers: Option<&str>, secret_key: Option<&str>) -> GlobalArgs {
        GlobalArgs {
            config: "config.toml".into(),
            brokers: brokers.map(Into::into),
            secret_key: secret_key.map(Into::into),
        }
    }

    #[test]
    fn defaults_apply_when_file_is_empty() {
        let eff = Effective::merge(&args(Some("localhost:9092"), Some("k")), None, Config::default()).unwrap();
        assert_eq!(eff.broker, BrokerKind::Kafka);
        assert_eq!(eff.api_port, 8080);
        assert_eq!(eff.kafka.brokers, "localhost:9092");
        assert_eq!(eff.engine.group_id, "myGroup");
        assert_eq!(eff.engine.offset_reset, OffsetReset::Earliest);
        assert_eq!(eff.engine.reserved_topics, ["__consumer_offsets"]);
        assert_eq!(eff.engine.flush_timeout, Duration::from_millis(200));
    }

    #[test]
    fn cli_overrides_file() {
        let cfg = Config::parse(
            r#"
            brokers = "file:9092"
            secret_key = "from-file"
            api_port = 9000
            group_id = "bridge"
            offset_reset = "latest"
            create_timeout_ms = 2500

            [kafka.properties]
            "client.id" = "bridge-1"
            "#,
            "test.toml",
        )
        .unwrap();
        let eff = Effective::merge(&args(Some("cli:9092"), None), Some(8181), cfg).unwrap();

        assert_eq!(eff.kafka.brokers, "cli:9092");
        assert_eq!(eff.secret_key, "from-file");
        assert_eq!(eff.api_port, 8181);
        assert_eq!(eff.engine.group_id, "bridge");
        assert_eq!(eff.engine.offset_reset, OffsetReset::Latest);
        assert_eq!(eff.engine.create_timeout, Duration::from_millis(2500));
        assert_eq!(eff.kafka.properties.get("client.id").map(String::as_str), Some("bridge-1"));
    }

    #[test]
    fn secret_key_is_required() {
        let err = Effective::merge(&args(Some("localhost:9092"), None), None, Config::default())
            .err()
            .unwrap();
        assert!(matches!(err, ServerError::Config { context: "secret_key", .. }));
    }

    #[test]
    fn kafka_needs_brokers_but_memory_does_not() {
        let err = Effective::merge(&args(None, Some("k")), None, Config::default()).err().unwrap();
        assert!(matches!(err, ServerError::Config { context: "brokers", .. }));

        let cfg = Config::parse("broker = \"memory\"\nmemory_topics = [\"orders\"]", "test.toml").unwrap();
        let eff = Effective::merge(&args(None, Some("k")), None, cfg).unwrap();
        assert_eq!(eff.broker, BrokerKind::Memory);
        assert_eq!(eff.memory_topics, ["orders"]);
    }

    #[test]
    fn unknown_offset_reset_is_rejected() {
        let cfg = Config::parse("offset_reset = \"middle\"", "test.toml").unwrap();
        let err = Effective::merge(&args(Some("b:9092"), Some("k")), None, cfg).err().unwrap();
        assert!(matches!(err, ServerError::Config { context: "offset_reset", .. }));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let mut a = args(Some("b:9092"), Some("k"));
        a.config = "/nonexistent/kafka-bridge.toml".into();
        let eff = Effective::new(&a, None).unwrap();
        assert_eq!(eff.api_port, 8080);
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "kafka-bridge", "send", "orders", "hello", "--brokers", "b:9092", "--secret-key", "k",
        ])
        .unwrap();
        assert_eq!(cli.global.brokers.as_deref(), Some("b:9092"));
        match cli.command {
            Commands::Send { topic, message } => {
                assert_eq!(topic, "orders");
                assert_eq!(message, "hello");
            }
            _ => panic!("expected send"),
        }
    }
}
