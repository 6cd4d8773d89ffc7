//! SMS and WhatsApp delivery through a Twilio-compatible messaging API.
//!
//! Both channels share one endpoint:
//! `POST {api_base}/2010-04-01/Accounts/{sid}/Messages.json` with a
//! form-encoded `From`/`To`/`Body` and HTTP basic auth `(sid, token)`.
//! WhatsApp addresses carry a `whatsapp:` prefix.

use async_trait::async_trait;
use comanda_core::channels::{Channel, WHATSAPP_ADDRESS_PREFIX};
use comanda_db::models::restaurant::Project;
use serde::Deserialize;

use super::{ChannelAdapter, OutboundMessage, SendResult};

/// Public Twilio API.
pub const DEFAULT_API_BASE: &str = "https://api.twilio.com";

/// Success and error bodies of the Messages resource. Only the fields the
/// engine reads are declared.
#[derive(Debug, Default, Deserialize)]
struct MessageResponse {
    sid: Option<String>,
    message: Option<String>,
    code: Option<i64>,
}

struct Credentials<'a> {
    account_sid: &'a str,
    auth_token: &'a str,
    from: &'a str,
}

pub struct TwilioAdapter {
    channel: Channel,
    client: reqwest::Client,
    api_base: String,
}

impl TwilioAdapter {
    pub fn sms(client: reqwest::Client, api_base: &str) -> Self {
        Self::new(Channel::Sms, client, api_base)
    }

    pub fn whatsapp(client: reqwest::Client, api_base: &str) -> Self {
        Self::new(Channel::Whatsapp, client, api_base)
    }

    fn new(channel: Channel, client: reqwest::Client, api_base: &str) -> Self {
        Self {
            channel,
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
            self.api_base
        )
    }

    /// Account credentials and sending number for this channel. WhatsApp
    /// prefers the dedicated number and falls back to the SMS one.
    fn credentials<'a>(&self, project: &'a Project) -> Option<Credentials<'a>> {
        let non_empty = |v: &'a Option<String>| v.as_deref().filter(|s| !s.trim().is_empty());

        let from = match self.channel {
            Channel::Whatsapp => {
                non_empty(&project.whatsapp_number).or(non_empty(&project.twilio_phone_number))
            }
            _ => non_empty(&project.twilio_phone_number),
        }?;

        Some(Credentials {
            account_sid: non_empty(&project.twilio_account_sid)?,
            auth_token: non_empty(&project.twilio_auth_token)?,
            from,
        })
    }

    fn address(&self, number: &str) -> String {
        match self.channel {
            Channel::Whatsapp => whatsapp_address(number),
            _ => number.to_string(),
        }
    }
}

/// Prefix `number` with `whatsapp:` unless it already carries it.
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with(WHATSAPP_ADDRESS_PREFIX) {
        number.to_string()
    } else {
        format!("{WHATSAPP_ADDRESS_PREFIX}{number}")
    }
}

#[async_trait]
impl ChannelAdapter for TwilioAdapter {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, project: &Project, message: &OutboundMessage) -> SendResult {
        let Some(creds) = self.credentials(project) else {
            return SendResult::failed(format!("{} provider not configured", self.channel));
        };

        let from = self.address(creds.from);
        let to = self.address(&message.recipient);
        let form = [
            ("From", from.as_str()),
            ("To", to.as_str()),
            ("Body", message.body.as_str()),
        ];

        let response = match self
            .client
            .post(self.messages_url(creds.account_sid))
            .basic_auth(creds.account_sid, Some(creds.auth_token))
            .form(&form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(channel = %self.channel, error = %e, "Messaging API request failed");
                return SendResult::failed(format!("provider request failed: {e}"));
            }
        };

        let status = response.status();
        let body: MessageResponse = response.json().await.unwrap_or_default();

        if !status.is_success() {
            let detail = body
                .message
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            let error = match body.code {
                Some(code) => format!("{detail} (code {code})"),
                None => detail,
            };
            tracing::warn!(channel = %self.channel, status = status.as_u16(), %error, "Messaging API rejected message");
            return SendResult::failed(error);
        }

        tracing::info!(channel = %self.channel, sid = ?body.sid, "Message accepted by provider");
        SendResult::sent(body.sid)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
