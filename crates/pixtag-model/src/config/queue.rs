use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EnvSource;
use crate::error::{ModelError, ModelResult};

/// Durable job queue settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    /// Broker hosts tried in order until one accepts the connection.
    pub hosts: Vec<String>,
    /// Broker port shared by all hosts.
    pub port: u16,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Virtual host.
    pub vhost: String,
    /// Queue name; declared durable with quorum replication.
    pub queue: String,
    /// Quorum `x-delivery-limit`: deliveries beyond this count are dead-lettered or dropped by the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_limit: Option<u32>,
    /// Exchange receiving deliveries that exhausted `delivery_limit`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dead_letter_exchange: Option<String>,
}

impl QueueConfig {
    pub const DEFAULT_PORT: u16 = 5672;

    /// Read `RABBITMQ_*` variables.
    pub fn from_source<F>(src: &EnvSource<F>) -> ModelResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let hosts: Vec<String> = src
            .required("RABBITMQ_HOST")?
            .split(',')
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if hosts.is_empty() {
            return Err(ModelError::InvalidVar {
                key: "RABBITMQ_HOST",
                reason: "no hosts listed".into(),
            });
        }

        Ok(Self {
            hosts,
            port: src.parse_or("RABBITMQ_PORT", Self::DEFAULT_PORT)?,
            username: src.optional("RABBITMQ_USERNAME").unwrap_or_else(|| "guest".into()),
            password: src.optional("RABBITMQ_PASSWORD").unwrap_or_else(|| "guest".into()),
            vhost: src.optional("RABBITMQ_VHOST").unwrap_or_else(|| "/".into()),
            queue: src.required("RABBITMQ_QUEUE")?,
            delivery_limit: src.parse_opt("RABBITMQ_DELIVERY_LIMIT")?,
            dead_letter_exchange: src.optional("RABBITMQ_DEAD_LETTER_EXCHANGE"),
        })
    }
}

impl fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConfig")
            .field("hosts", &self.hosts)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("vhost", &self.vhost)
            .field("queue", &self.queue)
            .field("delivery_limit", &self.delivery_limit)
            .field("dead_letter_exchange", &self.dead_letter_exchange)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> ModelResult<QueueConfig> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        QueueConfig::from_source(&EnvSource::new(|k: &str| map.get(k).map(|v| v.to_string())))
    }

    #[test]
    fn splits_failover_hosts() {
        let cfg = from(&[
            ("RABBITMQ_HOST", "rmq-0, rmq-1 ,,rmq-2"),
            ("RABBITMQ_QUEUE", "images"),
        ])
        .unwrap();

        assert_eq!(cfg.hosts, ["rmq-0", "rmq-1", "rmq-2"]);
        assert_eq!(cfg.port, 5672);
        assert_eq!(cfg.vhost, "/");
        assert_eq!(cfg.delivery_limit, None);
    }

    #[test]
    fn requires_host_and_queue() {
        assert!(matches!(
            from(&[("RABBITMQ_QUEUE", "images")]),
            Err(ModelError::MissingVar("RABBITMQ_HOST"))
        ));
        assert!(matches!(
            from(&[("RABBITMQ_HOST", "rmq")]),
            Err(ModelError::MissingVar("RABBITMQ_QUEUE"))
        ));
        assert!(matches!(
            from(&[("RABBITMQ_HOST", " , "), ("RABBITMQ_QUEUE", "q")]),
            Err(ModelError::InvalidVar { key: "RABBITMQ_HOST", .. })
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let cfg = from(&[
            ("RABBITMQ_HOST", "rmq"),
            ("RABBITMQ_QUEUE", "images"),
            ("RABBITMQ_PASSWORD", "hunter2"),
            ("RABBITMQ_DELIVERY_LIMIT", "5"),
        ])
        .unwrap();

        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("hunter2"));
        assert_eq!(cfg.delivery_limit, Some(5));

        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
