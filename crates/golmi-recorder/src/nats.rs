//! NATS bridge from the GOLMI server into the event channel.
//!
//! The server's state updates are published on `{prefix}.{event_name}`
//! (e.g. `golmi.update_state`). The bridge subscribes to `{prefix}.>` and
//! re-emits every message on the in-process [`EventChannel`] under the last
//! subject token, leaving it to the logger to pick the events it wants.

use futures::StreamExt;
use golmi_logger::EventChannel;
use golmi_types::ChannelEvent;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::RecorderError;

/// NATS connection scoped to one subject prefix.
pub struct NatsBridge {
    client: async_nats::Client,
    prefix: String,
}

impl NatsBridge {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str, prefix: &str) -> Result<Self, RecorderError> {
        info!(url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RecorderError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self {
            client,
            prefix: prefix.trim_end_matches('.').to_owned(),
        })
    }

    /// Subscribe to every subject under the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Nats`] if the subscription fails.
    pub async fn subscribe(&self) -> Result<async_nats::Subscriber, RecorderError> {
        let subject = format!("{}.>", self.prefix);
        let subscriber = self
            .client
            .subscribe(subject.clone())
            .await
            .map_err(|e| RecorderError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = %subject, "subscribed to state updates");
        Ok(subscriber)
    }

    /// Forward messages into `channel` until the subscription ends.
    pub async fn forward(self, mut subscriber: async_nats::Subscriber, channel: EventChannel) {
        while let Some(message) = subscriber.next().await {
            match decode(&self.prefix, message.subject.as_str(), &message.payload) {
                Ok(event) => {
                    let name = event.name.clone();
                    let receivers = channel.send(event);
                    debug!(event = %name, receivers, "forwarded channel event");
                }
                Err(e) => warn!(error = %e, "dropping NATS message"),
            }
        }
        info!("NATS subscription closed");
    }
}

impl std::fmt::Debug for NatsBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsBridge")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Event name carried by `subject`: its last token, if under `prefix`.
pub fn event_name<'a>(prefix: &str, subject: &'a str) -> Option<&'a str> {
    let rest = subject.strip_prefix(prefix)?.strip_prefix('.')?;
    rest.rsplit('.').next().filter(|name| !name.is_empty())
}

/// Turn a NATS message into a channel event.
///
/// An empty payload becomes `null`; anything else must be JSON.
///
/// # Errors
///
/// Returns [`RecorderError::Decode`] for subjects outside the prefix or
/// payloads that are not JSON.
pub fn decode(prefix: &str, subject: &str, payload: &[u8]) -> Result<ChannelEvent, RecorderError> {
    let name = event_name(prefix, subject).ok_or_else(|| RecorderError::Decode {
        subject: subject.to_owned(),
        reason: format!("subject is not under prefix {prefix}"),
    })?;
    let payload = if payload.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(payload).map_err(|e| RecorderError::Decode {
            subject: subject.to_owned(),
            reason: format!("payload is not JSON: {e}"),
        })?
    };
    Ok(ChannelEvent::new(name, payload))
}
