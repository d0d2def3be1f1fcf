//! Hands notification payloads to the delivery transport.
//!
//! Delivery is best-effort. [`Dispatcher::dispatch`] logs failures with
//! enough context for a manual replay and never returns them to the caller.

use crate::config::WebhookConfig;
use crate::http::HttpClient;
use crate::models::NotificationPayload;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Transport(#[from] anyhow::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError>;
}

/// POSTs each payload as JSON to a configured endpoint.
pub struct WebhookSink {
    http: HttpClient,
    config: WebhookConfig,
}

impl WebhookSink {
    pub fn new(http: HttpClient, config: WebhookConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError> {
        self.http
            .post_json(&self.config.url, payload, self.config.auth_header.as_deref())
            .await?;
        Ok(())
    }
}

/// Emits each payload as a structured log line.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn send(&self, payload: &NotificationPayload) -> Result<(), SinkError> {
        let body = serde_json::to_string(payload)?;
        info!(
            notification_id = %payload.notification_id,
            user = %payload.notify_user.display_name,
            event = %payload.event,
            subject = %payload.subject,
            payload = %body,
            "Notification"
        );
        Ok(())
    }
}

pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }

    /// Send one payload. Returns whether the transport accepted it.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> bool {
        match self.sink.send(payload).await {
            Ok(()) => {
                debug!(
                    notification_id = %payload.notification_id,
                    request_id = payload.request_id,
                    "Notification delivered"
                );
                true
            }
            Err(e) => {
                warn!(
                    media_id = payload.media_id,
                    request_id = payload.request_id,
                    event = ?payload.category,
                    is4k = payload.is4k,
                    notification_id = %payload.notification_id,
                    error = %e,
                    "Failed to deliver notification"
                );
                false
            }
        }
    }
}
