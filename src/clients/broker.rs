//! Capability boundary between the consumption loop and a message broker.
//!
//! `clients::rbmq` provides the RabbitMQ implementation. Anything else that
//! implements these traits (an in-memory double, for instance) can drive
//! [`MessageConsumer`](crate::consumer::MessageConsumer) unchanged.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::BrokerError;

/// Raw delivery bodies in the order the broker hands them over.
pub type DeliveryStream = BoxStream<'static, Result<Vec<u8>, BrokerError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    Fanout,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueOptions {
    pub durable: bool,
    pub exclusive: bool,
    pub auto_delete: bool,
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    type Connection: BrokerConnection;

    async fn dial(&self, uri: &str) -> Result<Self::Connection, BrokerError>;
}

#[async_trait]
pub trait BrokerConnection: Send + Sync {
    type Channel: BrokerChannel;

    async fn create_channel(&self) -> Result<Self::Channel, BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}

#[async_trait]
pub trait BrokerChannel: Send + Sync {
    async fn exchange_declare(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError>;

    async fn queue_declare(&self, name: &str, options: QueueOptions) -> Result<(), BrokerError>;

    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError>;

    /// With `auto_ack` the broker drops each message as soon as it is handed
    /// over; nothing is redelivered.
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        auto_ack: bool,
    ) -> Result<DeliveryStream, BrokerError>;

    async fn close(&self) -> Result<(), BrokerError>;
}
