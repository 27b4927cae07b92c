use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    Channel, Connection, ConnectionProperties,
    options::{
        BasicConsumeOptions, ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
};
use tracing::{debug, info};

use crate::{
    clients::broker::{
        BrokerChannel, BrokerConnection, ConnectionFactory, DeliveryStream, ExchangeKind,
        QueueOptions,
    },
    error::BrokerError,
};

const REPLY_SUCCESS: u16 = 200;

#[derive(Debug, Clone, Default)]
pub struct RabbitMqConnectionFactory;

pub struct RabbitMqConnection {
    connection: Connection,
}

pub struct RabbitMqChannel {
    channel: Channel,
}

#[async_trait]
impl ConnectionFactory for RabbitMqConnectionFactory {
    type Connection = RabbitMqConnection;

    async fn dial(&self, uri: &str) -> Result<Self::Connection, BrokerError> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;

        info!("RabbitMQ connection established");

        Ok(RabbitMqConnection { connection })
    }
}

#[async_trait]
impl BrokerConnection for RabbitMqConnection {
    type Channel = RabbitMqChannel;

    async fn create_channel(&self) -> Result<Self::Channel, BrokerError> {
        let channel = self.connection.create_channel().await?;

        debug!(channel_id = channel.id(), "RabbitMQ channel created");

        Ok(RabbitMqChannel { channel })
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.connection.close(REPLY_SUCCESS, "Bye").await?;
        Ok(())
    }
}

#[async_trait]
impl BrokerChannel for RabbitMqChannel {
    async fn exchange_declare(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError> {
        let kind = match kind {
            ExchangeKind::Fanout => lapin::ExchangeKind::Fanout,
        };

        self.channel
            .exchange_declare(
                name,
                kind,
                ExchangeDeclareOptions {
                    durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn queue_declare(&self, name: &str, options: QueueOptions) -> Result<(), BrokerError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions {
                    durable: options.durable,
                    exclusive: options.exclusive,
                    auto_delete: options.auto_delete,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.channel
            .queue_bind(
                queue,
                exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        auto_ack: bool,
    ) -> Result<DeliveryStream, BrokerError> {
        let consumer = self
            .channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions {
                    no_ack: auto_ack,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        Ok(consumer
            .map(|delivery| {
                delivery
                    .map(|delivery| delivery.data)
                    .map_err(BrokerError::from)
            })
            .boxed())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.channel.close(REPLY_SUCCESS, "Bye").await?;
        Ok(())
    }
}
