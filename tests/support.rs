use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};

use async_trait::async_trait;
use comment_notifier::{
    clients::broker::{
        BrokerChannel, BrokerConnection, ConnectionFactory, DeliveryStream, ExchangeKind,
        QueueOptions,
    },
    error::BrokerError,
};
use futures_util::{StreamExt, stream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

pub type Delivery = Result<Vec<u8>, BrokerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Nothing,
    Channel,
    ExchangeDeclare,
    QueueDeclare,
    QueueBind,
    Consume,
}

/// Everything the fake broker was asked to do.
#[derive(Default)]
pub struct CallLog {
    pub dials: AtomicU32,
    pub connection_closes: AtomicU32,
    pub channel_closes: AtomicU32,
    pub operations: Mutex<Vec<String>>,
}

impl CallLog {
    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn connection_closes(&self) -> u32 {
        self.connection_closes.load(Ordering::SeqCst)
    }

    pub fn channel_closes(&self) -> u32 {
        self.channel_closes.load(Ordering::SeqCst)
    }

    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().unwrap().clone()
    }

    fn record(&self, operation: String) {
        self.operations.lock().unwrap().push(operation);
    }
}

pub struct FakeFactory {
    failed_dials: u32,
    fail_at: FailAt,
    calls: Arc<CallLog>,
    deliveries: Arc<Mutex<Option<UnboundedReceiver<Delivery>>>>,
}

impl FakeFactory {
    /// A broker that accepts the first dial. Deliveries pushed into the returned
    /// sender show up on the consume stream; dropping it ends the stream.
    pub fn new(fail_at: FailAt) -> (Self, UnboundedSender<Delivery>, Arc<CallLog>) {
        Self::failing_dials(0, fail_at)
    }

    pub fn failing_dials(
        failed_dials: u32,
        fail_at: FailAt,
    ) -> (Self, UnboundedSender<Delivery>, Arc<CallLog>) {
        let (tx, rx) = unbounded_channel();
        let calls = Arc::new(CallLog::default());

        let factory = Self {
            failed_dials,
            fail_at,
            calls: Arc::clone(&calls),
            deliveries: Arc::new(Mutex::new(Some(rx))),
        };

        (factory, tx, calls)
    }

    pub fn unreachable() -> (Self, Arc<CallLog>) {
        let (factory, _, calls) = Self::failing_dials(u32::MAX, FailAt::Nothing);
        (factory, calls)
    }
}

#[async_trait]
impl ConnectionFactory for FakeFactory {
    type Connection = FakeConnection;

    async fn dial(&self, _uri: &str) -> Result<Self::Connection, BrokerError> {
        let attempt = self.calls.dials.fetch_add(1, Ordering::SeqCst) + 1;

        if attempt <= self.failed_dials {
            return Err(BrokerError::other("dial error"));
        }

        Ok(FakeConnection {
            fail_at: self.fail_at,
            calls: Arc::clone(&self.calls),
            deliveries: Arc::clone(&self.deliveries),
        })
    }
}

pub struct FakeConnection {
    fail_at: FailAt,
    calls: Arc<CallLog>,
    deliveries: Arc<Mutex<Option<UnboundedReceiver<Delivery>>>>,
}

#[async_trait]
impl BrokerConnection for FakeConnection {
    type Channel = FakeChannel;

    async fn create_channel(&self) -> Result<Self::Channel, BrokerError> {
        if self.fail_at == FailAt::Channel {
            return Err(BrokerError::other("channel error"));
        }

        Ok(FakeChannel {
            fail_at: self.fail_at,
            calls: Arc::clone(&self.calls),
            deliveries: Arc::clone(&self.deliveries),
        })
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.calls.connection_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeChannel {
    fail_at: FailAt,
    calls: Arc<CallLog>,
    deliveries: Arc<Mutex<Option<UnboundedReceiver<Delivery>>>>,
}

#[async_trait]
impl BrokerChannel for FakeChannel {
    async fn exchange_declare(
        &self,
        name: &str,
        kind: ExchangeKind,
        durable: bool,
    ) -> Result<(), BrokerError> {
        self.calls
            .record(format!("exchange_declare {name} {kind:?} durable={durable}"));

        if self.fail_at == FailAt::ExchangeDeclare {
            return Err(BrokerError::other("exchange declare error"));
        }
        Ok(())
    }

    async fn queue_declare(&self, name: &str, options: QueueOptions) -> Result<(), BrokerError> {
        self.calls.record(format!(
            "queue_declare {name} durable={} exclusive={} auto_delete={}",
            options.durable, options.exclusive, options.auto_delete
        ));

        if self.fail_at == FailAt::QueueDeclare {
            return Err(BrokerError::other("queue declare error"));
        }
        Ok(())
    }

    async fn queue_bind(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError> {
        self.calls
            .record(format!("queue_bind {queue} {exchange} key={routing_key:?}"));

        if self.fail_at == FailAt::QueueBind {
            return Err(BrokerError::other("queue bind error"));
        }
        Ok(())
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        auto_ack: bool,
    ) -> Result<DeliveryStream, BrokerError> {
        self.calls.record(format!(
            "consume {queue} tag={consumer_tag:?} auto_ack={auto_ack}"
        ));

        if self.fail_at == FailAt::Consume {
            return Err(BrokerError::other("consume error"));
        }

        let rx = self
            .deliveries
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BrokerError::other("already consuming"))?;

        Ok(stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|delivery| (delivery, rx))
        })
        .boxed())
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.calls.channel_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
