use std::fmt::{Display, Formatter, Result as FmtResult};

use thiserror::Error;

/// Failure reported by a broker adapter.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error(transparent)]
    Amqp(#[from] lapin::Error),

    #[error("{0}")]
    Other(String),
}

impl BrokerError {
    pub fn other(message: impl Into<String>) -> Self {
        BrokerError::Other(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyStep {
    ExchangeDeclare,
    QueueDeclare,
    QueueBind,
}

impl Display for TopologyStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TopologyStep::ExchangeDeclare => write!(f, "exchange declare"),
            TopologyStep::QueueDeclare => write!(f, "queue declare"),
            TopologyStep::QueueBind => write!(f, "queue bind"),
        }
    }
}

/// Setup failures of the consumption loop. Every variant is fatal to `run`.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("failed to connect to broker after {attempts} attempts: {source}")]
    Connection {
        attempts: u32,
        #[source]
        source: BrokerError,
    },

    #[error("failed to open broker channel: {0}")]
    Channel(#[source] BrokerError),

    #[error("failed to declare topology ({step}): {source}")]
    Topology {
        step: TopologyStep,
        #[source]
        source: BrokerError,
    },

    #[error("failed to start consuming: {0}")]
    Consume(#[source] BrokerError),
}

#[derive(Debug, Error)]
#[error("malformed comment notification: {0}")]
pub struct DecodeError(#[from] pub serde_json::Error);

#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid email address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("failed to send email: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}
