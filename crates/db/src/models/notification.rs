//! Notification engine entity models and DTOs.

use comanda_core::types::{DbId, Tenant, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notification_configs` table: routing for one
/// (tenant, event type).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationConfig {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub event_type: String,
    pub enabled: bool,
    /// Ordered channel ids (`sms`, `email`, `whatsapp`).
    pub channels: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationConfig {
    pub fn tenant(&self) -> Tenant {
        Tenant::new(self.org_id, self.project_id)
    }
}

/// DTO for creating or overwriting a routing config.
#[derive(Debug, Clone, Deserialize)]
pub struct UpsertConfig {
    pub event_type: String,
    pub enabled: bool,
    pub channels: Vec<String>,
}

/// A row from the `notification_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationTemplate {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub channel: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    /// Placeholder names the template expects. Informational only.
    pub variables: Vec<String>,
    pub active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTemplate {
    pub channel: String,
    pub name: String,
    pub subject: Option<String>,
    pub body: String,
    pub variables: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// DTO for updating a template. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub channel: Option<String>,
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub variables: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// A row from the `notification_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationEvent {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    /// Serialized trigger payload; the variable source for dispatch.
    pub data: serde_json::Value,
    pub processed: bool,
    pub created_at: Timestamp,
    pub processed_at: Option<Timestamp>,
}

impl NotificationEvent {
    pub fn tenant(&self) -> Tenant {
        Tenant::new(self.org_id, self.project_id)
    }
}

/// DTO for inserting an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    pub data: serde_json::Value,
}

/// A row from the `notification_logs` table: one dispatch attempt on one
/// channel.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationLog {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub event_type: String,
    pub channel: String,
    pub recipient: String,
    /// Template subject before rendering.
    pub subject: String,
    /// Template body before rendering.
    pub message: String,
    pub status: String,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub delivered_at: Option<Timestamp>,
}

/// DTO for appending a log row.
#[derive(Debug, Clone)]
pub struct NewLog {
    pub event_type: String,
    pub channel: String,
    pub recipient: String,
    pub subject: String,
    pub message: String,
    pub status: String,
    pub external_id: Option<String>,
    pub error_message: Option<String>,
}

/// A row from the `notification_inbound` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationInbound {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub channel: String,
    pub from_address: String,
    pub to_address: String,
    pub body: String,
    pub external_id: Option<String>,
    pub processed: bool,
    pub created_at: Timestamp,
}

/// DTO for recording an inbound message.
#[derive(Debug, Clone)]
pub struct NewInbound {
    pub channel: String,
    pub from_address: String,
    pub to_address: String,
    pub body: String,
    pub external_id: Option<String>,
}
