//! Relay configuration.
//!
//! [`RelayConfig`] carries the broker connection settings and the topic
//! name. An explicit `url` is used verbatim as the connection target;
//! otherwise the target is composed from `scheme`, `host`, and `port`.

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};
use crate::reconnect::ReconnectConfig;
use crate::transport::BrokerTarget;

/// Default transport scheme for composed targets.
fn default_scheme() -> String {
    "tcp".into()
}

/// Default broker hostname.
fn default_host() -> String {
    "localhost".into()
}

/// Default broker port.
const fn default_port() -> u16 {
    61616
}

/// Default client identifier prefix.
fn default_client_id_prefix() -> String {
    "purge-relay".into()
}

/// Broker connection and subscription settings for the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Explicit broker URL. When set (and non-blank) it is used verbatim.
    #[serde(default)]
    pub url: Option<String>,

    /// Transport scheme used when composing a target from host and port.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Broker hostname used when no explicit URL is set.
    #[serde(default = "default_host")]
    pub host: String,

    /// Broker port used when no explicit URL is set.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Topic carrying the invalidation notifications. Required.
    #[serde(default)]
    pub topic: String,

    /// Prefix for the per-connection unique client identifier.
    #[serde(default = "default_client_id_prefix")]
    pub client_id_prefix: String,

    /// Reconnection policy applied after a post-startup connection fault.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: None,
            scheme: default_scheme(),
            host: default_host(),
            port: default_port(),
            topic: String::new(),
            client_id_prefix: default_client_id_prefix(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Resolves the broker connection target.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingConfig`] when no topic is configured.
    pub fn broker_target(&self) -> RelayResult<BrokerTarget> {
        if self.topic.trim().is_empty() {
            return Err(RelayError::MissingConfig("topic".into()));
        }

        let url = match &self.url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!("{}://{}:{}", self.scheme, self.host, self.port),
        };

        Ok(BrokerTarget {
            url,
            topic: self.topic.clone(),
        })
    }
}
