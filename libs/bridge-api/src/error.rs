/// Category of a broker error. Shown in `Debug` output as `[kind]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerErrorKind {
    /// Could not open a session (admin, consumer or producer).
    Connection,
    /// Cluster metadata request failed or timed out.
    Metadata,
    /// Reading the next message failed. Transient.
    Read,
    /// The producer rejected a record.
    Publish,
    /// An administrative operation (topic creation) failed.
    Admin,
}

impl std::fmt::Display for BrokerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrokerErrorKind::Connection => f.write_str("connection"),
            BrokerErrorKind::Metadata => f.write_str("metadata"),
            BrokerErrorKind::Read => f.write_str("read"),
            BrokerErrorKind::Publish => f.write_str("publish"),
            BrokerErrorKind::Admin => f.write_str("admin"),
        }
    }
}

/// Unified error type for all broker capability methods.
#[derive(Clone)]
pub struct BrokerError {
    kind: BrokerErrorKind,
    message: String,
}

impl BrokerError {
    pub fn new(kind: BrokerErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Connection, msg)
    }

    pub fn metadata(msg: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Metadata, msg)
    }

    pub fn read(msg: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Read, msg)
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Publish, msg)
    }

    pub fn admin(msg: impl Into<String>) -> Self {
        Self::new(BrokerErrorKind::Admin, msg)
    }

    pub fn kind(&self) -> BrokerErrorKind {
        self.kind
    }

    /// Prepend context to the message, keeping the kind.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Debug for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for BrokerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BrokerError {}
