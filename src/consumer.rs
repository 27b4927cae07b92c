use std::future::Future;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    clients::broker::{
        BrokerChannel, BrokerConnection, ConnectionFactory, DeliveryStream, ExchangeKind,
        QueueOptions,
    },
    config::ConsumerConfig,
    error::{ConsumerError, TopologyStep},
    models::notification::CommentNotification,
    utils::retry_with_delay,
};

/// Empty tag lets the broker generate one.
const CONSUMER_TAG: &str = "";

/// Receives every successfully decoded notification, one at a time and in
/// arrival order. Failures are the handler's own concern.
#[async_trait]
pub trait NotificationHandler: Send + Sync + 'static {
    async fn handle(&self, notification: CommentNotification);
}

#[async_trait]
impl<F, Fut> NotificationHandler for F
where
    F: Fn(CommentNotification) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, notification: CommentNotification) {
        (self)(notification).await
    }
}

/// Keeps one subscription to the comment fanout exchange alive until cancelled.
///
/// A single consumer must not be `run` concurrently.
pub struct MessageConsumer<F> {
    config: ConsumerConfig,
    factory: F,
}

impl<F> MessageConsumer<F>
where
    F: ConnectionFactory,
{
    pub fn new(config: ConsumerConfig, factory: F) -> Self {
        Self { config, factory }
    }

    /// Connects, declares the topology and streams deliveries into `handler`
    /// until `cancel` fires.
    ///
    /// Only the dial is retried. Every setup failure releases whatever was
    /// opened before returning. Cancelling while still dialing returns `Ok`
    /// with nothing left open. `cancel` should be fired once, after `run`
    /// has started.
    pub async fn run<H>(&self, handler: H, cancel: CancellationToken) -> Result<(), ConsumerError>
    where
        H: NotificationHandler,
    {
        let connection = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Shutdown requested while connecting, giving up");
                return Ok(());
            }
            connection = self.connect() => connection?,
        };

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                error!(error = %e, "Failed to open channel");
                close_connection(&connection).await;
                return Err(ConsumerError::Channel(e));
            }
        };

        let deliveries = match self.subscribe(&channel).await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                error!(error = %e, "Consumer setup failed");
                close_channel(&channel).await;
                close_connection(&connection).await;
                return Err(e);
            }
        };

        info!(queue = %self.config.queue_name, "Waiting for messages");

        let streaming = tokio::spawn(stream_deliveries(deliveries, handler, cancel.child_token()));

        cancel.cancelled().await;

        info!("Shutdown requested, stopping consumer");

        if let Err(e) = streaming.await {
            warn!(error = %e, "Delivery task terminated abnormally");
        }

        close_channel(&channel).await;
        close_connection(&connection).await;

        info!("Consumer stopped");

        Ok(())
    }

    async fn connect(&self) -> Result<F::Connection, ConsumerError> {
        let policy = self.config.retry_policy();
        let max_attempts = policy.max_attempts;
        let factory = &self.factory;
        let uri = self.config.broker_uri.as_str();

        retry_with_delay(&policy, move |attempt| {
            info!(attempt, max_attempts, "Connecting to RabbitMQ");
            factory.dial(uri)
        })
        .await
        .map_err(|source| ConsumerError::Connection {
            attempts: max_attempts,
            source,
        })
    }

    async fn subscribe<C>(&self, channel: &C) -> Result<DeliveryStream, ConsumerError>
    where
        C: BrokerChannel,
    {
        let exchange = self.config.exchange_name.as_str();
        let queue = self.config.queue_name.as_str();

        channel
            .exchange_declare(exchange, ExchangeKind::Fanout, true)
            .await
            .map_err(|source| ConsumerError::Topology {
                step: TopologyStep::ExchangeDeclare,
                source,
            })?;

        debug!(exchange, "Exchange declared");

        channel
            .queue_declare(
                queue,
                QueueOptions {
                    durable: true,
                    exclusive: false,
                    auto_delete: false,
                },
            )
            .await
            .map_err(|source| ConsumerError::Topology {
                step: TopologyStep::QueueDeclare,
                source,
            })?;

        debug!(queue, "Queue declared");

        // Fanout exchanges ignore the routing key.
        channel
            .queue_bind(queue, exchange, "")
            .await
            .map_err(|source| ConsumerError::Topology {
                step: TopologyStep::QueueBind,
                source,
            })?;

        debug!(queue, exchange, "Queue bound to exchange");

        channel
            .consume(queue, CONSUMER_TAG, true)
            .await
            .map_err(ConsumerError::Consume)
    }
}

async fn stream_deliveries<H>(mut deliveries: DeliveryStream, handler: H, cancel: CancellationToken)
where
    H: NotificationHandler,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(body)) => process_delivery(&body, &handler).await,
            Some(Err(e)) => warn!(error = %e, "Failed to receive delivery"),
            None => {
                warn!("Delivery stream closed by broker");
                break;
            }
        }
    }

    debug!("Delivery task stopped");
}

async fn process_delivery<H>(body: &[u8], handler: &H)
where
    H: NotificationHandler,
{
    debug!(body = %String::from_utf8_lossy(body), "Message received");

    match CommentNotification::decode(body) {
        Ok(notification) => handler.handle(notification).await,
        Err(e) => warn!(error = %e, "Skipping malformed message"),
    }
}

async fn close_channel<C: BrokerChannel>(channel: &C) {
    if let Err(e) = channel.close().await {
        warn!(error = %e, "Failed to close channel");
    }
}

async fn close_connection<C: BrokerConnection>(connection: &C) {
    if let Err(e) = connection.close().await {
        warn!(error = %e, "Failed to close connection");
    }
}
