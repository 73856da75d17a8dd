//! RabbitMQ consumer sessions over lapin.
//!
//! Every session opens its own connection with prefetch 1 and declares the queue as a durable
//! quorum queue. Closing the connection returns any unacknowledged delivery to the queue.
//! [`AmqpConnector::ping`] only declares, so a startup check never holds a delivery.
use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    Channel, Connection, ConnectionProperties,
    options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions},
    types::{AMQPValue, FieldTable},
    uri::{AMQPAuthority, AMQPUri, AMQPUserInfo},
};
use tracing::{debug, info, warn};

use pixtag_core::queue::{Acker, Delivery, JobSource, QueueConnector, QueueError, QueueResult};
use pixtag_model::config::QueueConfig;

/// Consumer tag announced to the broker.
pub const CONSUMER_TAG: &str = "pixtag-worker";

/// Opens lapin sessions, trying the configured hosts in order.
#[derive(Debug, Clone)]
pub struct AmqpConnector {
    cfg: QueueConfig,
}

impl AmqpConnector {
    pub fn new(cfg: QueueConfig) -> Self {
        Self { cfg }
    }

    async fn connect_any(&self) -> QueueResult<(Connection, String)> {
        let mut failures = Vec::with_capacity(self.cfg.hosts.len());
        for host in &self.cfg.hosts {
            match Connection::connect_uri(broker_uri(&self.cfg, host), ConnectionProperties::default())
                .await
            {
                Ok(conn) => return Ok((conn, host.clone())),
                Err(e) => {
                    warn!(host = %host, error = %e, "broker connection failed");
                    failures.push(format!("{host}: {e}"));
                }
            }
        }
        Err(QueueError::Connectivity(format!(
            "no broker reachable ({})",
            failures.join("; ")
        )))
    }

    async fn declare(&self, channel: &Channel) -> lapin::Result<()> {
        channel
            .queue_declare(
                &self.cfg.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                queue_arguments(&self.cfg),
            )
            .await
            .map(|_| ())
    }

    async fn open_channel(&self, conn: &Connection) -> lapin::Result<(Channel, lapin::Consumer)> {
        let channel = conn.create_channel().await?;
        channel.basic_qos(1, BasicQosOptions::default()).await?;
        self.declare(&channel).await?;
        let consumer = channel
            .basic_consume(
                &self.cfg.queue,
                CONSUMER_TAG,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;
        Ok((channel, consumer))
    }
}

#[async_trait]
impl QueueConnector for AmqpConnector {
    fn name(&self) -> &'static str {
        "amqp"
    }

    /// Connect and declare the queue without a consumer, so no delivery is taken.
    async fn ping(&self) -> QueueResult<()> {
        let (conn, host) = self.connect_any().await?;
        let declared = match conn.create_channel().await {
            Ok(channel) => self.declare(&channel).await,
            Err(e) => Err(e),
        };
        if let Err(e) = conn.close(200, "ping").await {
            debug!(host = %host, error = %e, "ping connection close failed");
        }
        declared.map_err(|e| {
            QueueError::Protocol(format!("queue {:?} declare failed: {e}", self.cfg.queue))
        })
    }

    async fn connect(&self) -> QueueResult<Box<dyn JobSource>> {
        let (conn, host) = self.connect_any().await?;
        let (channel, consumer) = match self.open_channel(&conn).await {
            Ok(pair) => pair,
            Err(e) => {
                let _ = conn.close(0, "setup failed").await;
                return Err(QueueError::Protocol(format!(
                    "queue {:?} setup failed: {e}",
                    self.cfg.queue
                )));
            }
        };
        info!(host = %host, queue = %self.cfg.queue, "consuming");
        Ok(Box::new(AmqpSession {
            conn,
            channel,
            consumer,
        }))
    }
}

/// Connection URI for one broker host.
pub fn broker_uri(cfg: &QueueConfig, host: &str) -> AMQPUri {
    AMQPUri {
        authority: AMQPAuthority {
            userinfo: AMQPUserInfo {
                username: cfg.username.clone(),
                password: cfg.password.clone(),
            },
            host: host.to_string(),
            port: cfg.port,
        },
        vhost: cfg.vhost.clone(),
        ..AMQPUri::default()
    }
}

/// Quorum queue arguments, plus delivery limit and dead-letter exchange when configured.
pub fn queue_arguments(cfg: &QueueConfig) -> FieldTable {
    let mut args = FieldTable::default();
    args.insert("x-queue-type".into(), AMQPValue::LongString("quorum".into()));
    if let Some(limit) = cfg.delivery_limit {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        args.insert("x-delivery-limit".into(), AMQPValue::LongInt(limit));
    }
    if let Some(dlx) = &cfg.dead_letter_exchange {
        args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(dlx.as_str().into()),
        );
    }
    args
}

struct AmqpSession {
    conn: Connection,
    channel: Channel,
    consumer: lapin::Consumer,
}

#[async_trait]
impl JobSource for AmqpSession {
    async fn next(&mut self) -> QueueResult<Option<Delivery>> {
        match self.consumer.next().await {
            Some(Ok(d)) => {
                debug!(tag = d.delivery_tag, redelivered = d.redelivered, "delivery received");
                let acker = AmqpAcker(d.acker);
                Ok(Some(Delivery::new(
                    d.delivery_tag,
                    d.data,
                    d.redelivered,
                    Box::new(acker),
                )))
            }
            Some(Err(e)) => Err(QueueError::Connectivity(format!("consumer stream: {e}"))),
            None => Err(QueueError::Connectivity("consumer stream closed by broker".into())),
        }
    }

    async fn close(&mut self) -> QueueResult<()> {
        if let Err(e) = self.channel.close(200, "session ended").await {
            debug!(error = %e, "channel close failed");
        }
        self.conn
            .close(200, "session ended")
            .await
            .map_err(|e| QueueError::Connectivity(format!("connection close: {e}")))
    }
}

struct AmqpAcker(lapin::acker::Acker);

#[async_trait]
impl Acker for AmqpAcker {
    async fn ack(&self) -> QueueResult<()> {
        self.0
            .ack(BasicAckOptions::default())
            .await
            .map(|_| ())
            .map_err(|e| QueueError::Ack(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use lapin::types::ShortString;

    use super::*;

    fn cfg() -> QueueConfig {
        QueueConfig {
            hosts: vec!["rmq-1".into(), "rmq-2".into()],
            port: 5673,
            username: "worker".into(),
            password: "s3cret".into(),
            vhost: "images".into(),
            queue: "classify".into(),
            delivery_limit: None,
            dead_letter_exchange: None,
        }
    }

    #[test]
    fn uri_targets_the_given_host() {
        let uri = broker_uri(&cfg(), "rmq-2");
        assert_eq!(uri.authority.host, "rmq-2");
        assert_eq!(uri.authority.port, 5673);
        assert_eq!(uri.authority.userinfo.username, "worker");
        assert_eq!(uri.authority.userinfo.password, "s3cret");
        assert_eq!(uri.vhost, "images");
    }

    #[test]
    fn queue_is_quorum_by_default() {
        let args = queue_arguments(&cfg());
        let inner = args.inner();
        assert_eq!(inner.len(), 1);
        assert_eq!(
            inner.get(&ShortString::from("x-queue-type")),
            Some(&AMQPValue::LongString("quorum".into()))
        );
    }

    #[test]
    fn delivery_limit_and_dead_letter_are_declared() {
        let mut cfg = cfg();
        cfg.delivery_limit = Some(5);
        cfg.dead_letter_exchange = Some("pixtag.dlx".into());

        let args = queue_arguments(&cfg);
        let inner = args.inner();
        assert_eq!(
            inner.get(&ShortString::from("x-delivery-limit")),
            Some(&AMQPValue::LongInt(5))
        );
        assert_eq!(
            inner.get(&ShortString::from("x-dead-letter-exchange")),
            Some(&AMQPValue::LongString("pixtag.dlx".into()))
        );
    }

    #[tokio::test]
    async fn unreachable_brokers_are_a_connectivity_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut cfg = cfg();
        cfg.hosts = vec!["127.0.0.1".into()];
        cfg.port = port;

        let connector = AmqpConnector::new(cfg);
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, QueueError::Connectivity(_)));
        assert!(matches!(
            connector.ping().await,
            Err(QueueError::Connectivity(_))
        ));
    }
}
