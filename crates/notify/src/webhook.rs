//! Provider callbacks: delivery status and inbound messages.

use std::sync::Arc;

use comanda_core::channels::Channel;
use comanda_core::types::Tenant;
use comanda_db::models::notification::{NewInbound, NotificationInbound};
use serde::Deserialize;

use crate::error::{NotifyError, NotifyResult};
use crate::store::NotificationStore;

/// Delivery-status callback fields.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
    #[serde(rename = "MessageStatus")]
    pub message_status: String,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
}

/// Inbound-message callback fields.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "MessageSid", default)]
    pub message_sid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusMatch {
    /// Number of log rows updated.
    Updated(u64),
    /// No log carries the message id.
    NoMatch,
}

pub struct WebhookIngest {
    store: Arc<dyn NotificationStore>,
}

impl WebhookIngest {
    pub fn new(store: Arc<dyn NotificationStore>) -> Self {
        Self { store }
    }

    /// Reconcile the logs of one provider message with its latest status.
    pub async fn apply_status(&self, update: &StatusUpdate) -> NotifyResult<StatusMatch> {
        let sid = update.message_sid.trim();
        let status = update.message_status.trim();
        if sid.is_empty() || status.is_empty() {
            return Err(NotifyError::Payload(
                "MessageSid and MessageStatus are required".into(),
            ));
        }

        let error_message = update
            .error_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(|code| format!("provider error {code}"));

        let matched = self
            .store
            .apply_provider_status(sid, status, error_message.as_deref())
            .await?;

        if matched == 0 {
            tracing::debug!(sid, status, "Status callback for unknown message");
            Ok(StatusMatch::NoMatch)
        } else {
            tracing::info!(sid, status, matched, "Delivery status applied");
            Ok(StatusMatch::Updated(matched))
        }
    }

    /// Store an inbound message. The channel is inferred from the `To`
    /// address.
    pub async fn record_inbound(
        &self,
        tenant: Tenant,
        message: &InboundMessage,
    ) -> NotifyResult<NotificationInbound> {
        let channel = Channel::from_inbound_address(&message.to);
        let inbound = self
            .store
            .create_inbound(
                tenant,
                &NewInbound {
                    channel: channel.as_str().to_string(),
                    from_address: message.from.clone(),
                    to_address: message.to.clone(),
                    body: message.body.clone(),
                    external_id: message
                        .message_sid
                        .clone()
                        .filter(|sid| !sid.trim().is_empty()),
                },
            )
            .await?;

        tracing::info!(%tenant, %channel, inbound_id = inbound.id, "Inbound message recorded");
        Ok(inbound)
    }
}
