//! Comanda notification dispatch engine.
//!
//! Turns restaurant domain events into outbound SMS, WhatsApp and email
//! messages using per-tenant routing configs and templates:
//!
//! - [`Dispatcher`]: config → recipient → template → render → adapter →
//!   log, one channel at a time.
//! - [`EventProcessor`]: persists events and dispatches them inline;
//!   exposes the fire-and-forget domain triggers.
//! - [`scheduler`]: recurring sweeps (24h confirmations, pending events,
//!   log cleanup).
//! - [`WebhookIngest`]: provider delivery-status and inbound callbacks.
//! - [`channels`]: Twilio-compatible SMS/WhatsApp and SMTP adapters.
//!
//! Storage and the restaurant CRUD service are reached through the
//! [`NotificationStore`] and [`TenantDirectory`] traits.

pub mod channels;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod processor;
pub mod scheduler;
pub mod store;
pub mod timezone;
pub mod webhook;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use channels::{ChannelAdapter, ChannelRegistry, SendResult, SendStatus};
pub use config::NotifyConfig;
pub use directory::{PgTenantDirectory, TenantDirectory};
pub use dispatcher::{
    ChannelDisposition, ChannelOutcome, DispatchReport, DispatchSkip, Dispatcher, Recipients,
};
pub use error::NotifyError;
pub use processor::{EventProcessor, ProcessedEvent, TriggerOutcome};
pub use scheduler::{RecurringJob, SweepReport};
pub use store::{NotificationStore, PgNotificationStore};
pub use webhook::{InboundMessage, StatusMatch, StatusUpdate, WebhookIngest};
