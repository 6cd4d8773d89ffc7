//! Outbound message channels.
//!
//! The string forms must match the values stored in
//! `notification_configs.channels`, `notification_templates.channel` and
//! `notification_logs.channel`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// SMS delivered through the Twilio-compatible messaging API.
pub const CHANNEL_SMS: &str = "sms";

/// Email delivered via SMTP.
pub const CHANNEL_EMAIL: &str = "email";

/// WhatsApp message delivered through the same messaging API as SMS.
pub const CHANNEL_WHATSAPP: &str = "whatsapp";

/// Address prefix the messaging provider uses for WhatsApp numbers.
pub const WHATSAPP_ADDRESS_PREFIX: &str = "whatsapp:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
    Whatsapp,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Sms, Channel::Email, Channel::Whatsapp];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Sms => CHANNEL_SMS,
            Channel::Email => CHANNEL_EMAIL,
            Channel::Whatsapp => CHANNEL_WHATSAPP,
        }
    }

    /// Whether the channel addresses its recipient by phone number.
    pub fn uses_phone(self) -> bool {
        matches!(self, Channel::Sms | Channel::Whatsapp)
    }

    /// Infer the channel of an inbound message from its destination address.
    ///
    /// The provider marks WhatsApp numbers with a `whatsapp:` prefix; every
    /// other address is treated as plain SMS.
    pub fn from_inbound_address(to: &str) -> Channel {
        if to.starts_with(WHATSAPP_ADDRESS_PREFIX) {
            Channel::Whatsapp
        } else {
            Channel::Sms
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a channel string is not one of the supported channels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported channel: {0}")]
pub struct UnsupportedChannel(pub String);

impl FromStr for Channel {
    type Err = UnsupportedChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CHANNEL_SMS => Ok(Channel::Sms),
            CHANNEL_EMAIL => Ok(Channel::Email),
            CHANNEL_WHATSAPP => Ok(Channel::Whatsapp),
            other => Err(UnsupportedChannel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_channels() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>(), Ok(channel));
        }
    }

    #[test]
    fn unknown_channel_error_names_the_channel() {
        let err = "fax".parse::<Channel>().unwrap_err();
        assert_eq!(err.to_string(), "unsupported channel: fax");
    }

    #[test]
    fn inbound_address_prefix_selects_whatsapp() {
        assert_eq!(
            Channel::from_inbound_address("whatsapp:+551199999999"),
            Channel::Whatsapp
        );
        assert_eq!(Channel::from_inbound_address("+551199999999"), Channel::Sms);
    }
}
