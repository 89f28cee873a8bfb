//! Request/response messaging to the worker context with bounded retries.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use feedlens_logging::{lens_debug, lens_error, lens_warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::messages::WireMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Total delivery attempts, the first one included.
    pub max_attempts: u32,
    /// Fixed pause after a failed attempt, except the last.
    pub retry_delay: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1000),
        }
    }
}

/// One delivery attempt of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub request_id: u64,
    pub attempt: u32,
    pub body: Value,
}

impl Envelope {
    /// Builds the reply for this attempt, echoing its identifiers.
    pub fn reply(&self, body: Value) -> Reply {
        Reply {
            request_id: self.request_id,
            attempt: self.attempt,
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub request_id: u64,
    pub attempt: u32,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The receiving context does not exist right now.
    #[error("receiving context does not exist")]
    ContextGone,
    #[error("delivery failed: {0}")]
    Transient(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("receiving context does not exist")]
    ContextGone,
    #[error("maximum number of attempts reached ({attempts}): {last_error}")]
    DeliveryExhausted { attempts: u32, last_error: String },
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Moves one envelope to the other context and waits for its reply.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, envelope: Envelope) -> Result<Reply, DeliveryError>;
}

pub struct RetryChannel {
    transport: Arc<dyn Transport>,
    settings: ChannelSettings,
    next_request_id: AtomicU64,
}

impl RetryChannel {
    pub fn new(transport: Arc<dyn Transport>, settings: ChannelSettings) -> Self {
        Self {
            transport,
            settings,
            next_request_id: AtomicU64::new(1),
        }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Sends `message`, retrying transient failures. Attempts are sequential;
    /// only a reply to the latest attempt is accepted.
    pub async fn send(&self, message: &WireMessage) -> Result<Value, SendError> {
        let body = serde_json::to_value(message).map_err(|err| SendError::Protocol(err.to_string()))?;
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let max_attempts = self.settings.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let envelope = Envelope {
                request_id,
                attempt,
                body: body.clone(),
            };
            match self.transport.deliver(envelope).await {
                Ok(reply) if reply.request_id == request_id && reply.attempt == attempt => {
                    lens_debug!("Request {request_id} answered on attempt {attempt}");
                    return Ok(reply.body);
                }
                Ok(reply) => {
                    last_error = format!(
                        "stale reply for request {} attempt {}",
                        reply.request_id, reply.attempt
                    );
                    lens_warn!("Attempt {attempt}: {last_error}");
                }
                Err(DeliveryError::ContextGone) => return Err(SendError::ContextGone),
                Err(DeliveryError::Transient(message)) => {
                    lens_warn!("Attempt {attempt}: {message}");
                    last_error = message;
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.settings.retry_delay).await;
            }
        }

        lens_error!("Request {request_id} failed after {max_attempts} attempts: {last_error}");
        Err(SendError::DeliveryExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    /// Like [`RetryChannel::send`], decoding the reply body.
    pub async fn request<R: DeserializeOwned>(&self, message: &WireMessage) -> Result<R, SendError> {
        let body = self.send(message).await?;
        serde_json::from_value(body).map_err(|err| SendError::Protocol(err.to_string()))
    }
}
