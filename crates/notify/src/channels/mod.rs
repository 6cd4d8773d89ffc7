//! Channel adapters: the provider side of a dispatch.
//!
//! An adapter turns one rendered message into one provider call and reports
//! the outcome as a [`SendResult`]. Provider failures are values, never
//! `Err`, so the dispatcher can log every attempt.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use comanda_core::channels::Channel;
use comanda_core::log_status;
use comanda_db::models::restaurant::Project;

pub mod email;
pub mod twilio;

pub use email::SmtpAdapter;
pub use twilio::TwilioAdapter;

// ---------------------------------------------------------------------------
// SendResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Sent,
    Failed,
}

impl SendStatus {
    /// The value written to `notification_logs.status`.
    pub fn as_str(self) -> &'static str {
        match self {
            SendStatus::Sent => log_status::SENT,
            SendStatus::Failed => log_status::FAILED,
        }
    }
}

/// Outcome of one provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub status: SendStatus,
    /// Provider message id, used to match later status callbacks.
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl SendResult {
    pub fn sent(external_id: Option<String>) -> Self {
        Self {
            status: SendStatus::Sent,
            external_id,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: SendStatus::Failed,
            external_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == SendStatus::Sent
    }
}

// ---------------------------------------------------------------------------
// ChannelAdapter
// ---------------------------------------------------------------------------

/// A rendered message ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn channel(&self) -> Channel;

    /// Deliver `message` with the provider settings of `project`.
    async fn send(&self, project: &Project, message: &OutboundMessage) -> SendResult;
}

/// Maps each channel to the adapter that delivers it.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    adapters: HashMap<Channel, Arc<dyn ChannelAdapter>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own channel, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.channel(), adapter);
    }

    pub fn with(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.register(adapter);
        self
    }

    pub fn get(&self, channel: Channel) -> Option<&Arc<dyn ChannelAdapter>> {
        self.adapters.get(&channel)
    }

    /// The production set: Twilio SMS and WhatsApp plus SMTP email.
    pub fn standard(
        twilio_api_base: &str,
        provider_timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let client = http_client(provider_timeout)?;
        Ok(Self::new()
            .with(Arc::new(TwilioAdapter::sms(client.clone(), twilio_api_base)))
            .with(Arc::new(TwilioAdapter::whatsapp(client, twilio_api_base)))
            .with(Arc::new(SmtpAdapter::new(provider_timeout))))
    }
}

/// Shared HTTP client for provider calls.
pub fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_status_maps_to_log_status() {
        assert_eq!(SendStatus::Sent.as_str(), "sent");
        assert_eq!(SendStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn standard_registry_covers_every_channel() {
        let registry = ChannelRegistry::standard(twilio::DEFAULT_API_BASE, None).unwrap();
        for channel in Channel::ALL {
            let adapter = registry.get(channel).expect("adapter registered");
            assert_eq!(adapter.channel(), channel);
        }
    }
}
