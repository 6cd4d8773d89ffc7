//! Config → recipient → template → render → adapter → log.
//!
//! [`Dispatcher::dispatch`] walks the channels of a tenant's routing config
//! in order. Every channel that reaches a provider gets exactly one log row
//! holding the pre-render template text and the provider outcome; channels
//! without a recipient or an active template are skipped without a row.
//! Nothing here returns `Err`: failures are reported in [`DispatchReport`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use comanda_core::channels::Channel;
use comanda_core::render::render_at;
use comanda_core::types::{DbId, Tenant};
use comanda_db::models::notification::NewLog;
use comanda_db::models::restaurant::Project;
use serde::Serialize;

use crate::channels::{ChannelRegistry, OutboundMessage, SendResult, SendStatus};
use crate::directory::TenantDirectory;
use crate::error::{NotifyError, NotifyResult};
use crate::store::NotificationStore;
use crate::timezone;

// ---------------------------------------------------------------------------
// Recipients
// ---------------------------------------------------------------------------

/// Where a notification goes: phone for SMS/WhatsApp, email for email.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Recipients {
    pub fn new(phone: Option<String>, email: Option<String>) -> Self {
        Self { phone, email }
    }

    /// The address for `channel`, `None` when missing or blank.
    pub fn for_channel(&self, channel: Channel) -> Option<&str> {
        let address = if channel.uses_phone() {
            self.phone.as_deref()
        } else {
            self.email.as_deref()
        };
        address.map(str::trim).filter(|a| !a.is_empty())
    }

    /// Every non-blank address.
    pub fn addresses(&self) -> Vec<String> {
        [self.phone.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// DispatchReport
// ---------------------------------------------------------------------------

/// Why a whole dispatch did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchSkip {
    ConfigMissing,
    ConfigDisabled,
    ProjectMissing,
}

/// What happened on one configured channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChannelDisposition {
    Sent { external_id: Option<String> },
    Failed { error: String },
    NoRecipient,
    NoTemplate,
    UnsupportedChannel,
    NoAdapter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelOutcome {
    pub channel: String,
    #[serde(flatten)]
    pub disposition: ChannelDisposition,
    /// The log row written for this attempt; `None` when skipped or when
    /// the log write failed.
    pub log_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub event_type: String,
    /// Channels that reached an adapter.
    pub attempted: usize,
    /// Attempts the provider accepted.
    pub delivered: usize,
    pub failed: usize,
    pub skipped: Option<DispatchSkip>,
    pub channels: Vec<ChannelOutcome>,
    /// Storage errors met along the way, joined with `; `.
    pub error: Option<String>,
}

impl DispatchReport {
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            attempted: 0,
            delivered: 0,
            failed: 0,
            skipped: None,
            channels: Vec::new(),
            error: None,
        }
    }

    fn skip(mut self, reason: DispatchSkip) -> Self {
        self.skipped = Some(reason);
        self
    }

    pub fn record_error(&mut self, error: impl std::fmt::Display) {
        let error = error.to_string();
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{existing}; {error}"),
            None => error,
        });
    }

    fn push(&mut self, channel: &str, disposition: ChannelDisposition, log_id: Option<DbId>) {
        self.channels.push(ChannelOutcome {
            channel: channel.to_string(),
            disposition,
            log_id,
        });
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    store: Arc<dyn NotificationStore>,
    directory: Arc<dyn TenantDirectory>,
    adapters: ChannelRegistry,
    default_timezone: Tz,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn TenantDirectory>,
        adapters: ChannelRegistry,
        default_timezone: Tz,
    ) -> Self {
        Self {
            store,
            directory,
            adapters,
            default_timezone,
        }
    }

    /// Dispatch `event_type` for `tenant` on every configured channel.
    pub async fn dispatch(
        &self,
        tenant: Tenant,
        event_type: &str,
        recipients: &Recipients,
        variables: &HashMap<String, String>,
    ) -> DispatchReport {
        self.dispatch_at(tenant, event_type, recipients, variables, Utc::now())
            .await
    }

    /// [`dispatch`](Self::dispatch) with an explicit clock for the
    /// `{{data}}`/`{{hora}}` placeholders.
    pub async fn dispatch_at(
        &self,
        tenant: Tenant,
        event_type: &str,
        recipients: &Recipients,
        variables: &HashMap<String, String>,
        now: DateTime<Utc>,
    ) -> DispatchReport {
        let mut report = DispatchReport::new(event_type);

        let config = match self.store.find_config(tenant, event_type).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::debug!(%tenant, event_type, "No notification config, skipping");
                return report.skip(DispatchSkip::ConfigMissing);
            }
            Err(e) => {
                tracing::error!(%tenant, event_type, error = %e, "Failed to load notification config");
                report.record_error(e);
                return report;
            }
        };
        if !config.enabled {
            tracing::debug!(%tenant, event_type, "Notification config disabled, skipping");
            return report.skip(DispatchSkip::ConfigDisabled);
        }

        let project = match self.directory.project(tenant).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                tracing::warn!(%tenant, event_type, "Project not found, skipping dispatch");
                report.record_error(NotifyError::ProjectNotFound(tenant));
                return report.skip(DispatchSkip::ProjectMissing);
            }
            Err(e) => {
                tracing::error!(%tenant, event_type, error = %e, "Failed to load project");
                report.record_error(e);
                return report.skip(DispatchSkip::ProjectMissing);
            }
        };
        let local_now = self.local_now(&project, now);

        for channel_id in &config.channels {
            let channel = match channel_id.parse::<Channel>() {
                Ok(channel) => channel,
                Err(e) => {
                    tracing::warn!(%tenant, event_type, channel = %channel_id, "{e}, skipping");
                    report.push(channel_id, ChannelDisposition::UnsupportedChannel, None);
                    continue;
                }
            };

            let Some(recipient) = recipients.for_channel(channel) else {
                tracing::debug!(%tenant, event_type, %channel, "No recipient for channel, skipping");
                report.push(channel_id, ChannelDisposition::NoRecipient, None);
                continue;
            };

            let template = match self.store.find_active_template(tenant, channel).await {
                Ok(Some(template)) => template,
                Ok(None) => {
                    tracing::debug!(%tenant, event_type, %channel, "No active template, skipping");
                    report.push(channel_id, ChannelDisposition::NoTemplate, None);
                    continue;
                }
                Err(e) => {
                    tracing::error!(%tenant, event_type, %channel, error = %e, "Failed to load template");
                    report.record_error(e);
                    report.push(channel_id, ChannelDisposition::NoTemplate, None);
                    continue;
                }
            };

            let Some(adapter) = self.adapters.get(channel) else {
                tracing::warn!(%tenant, event_type, %channel, "No adapter registered, skipping");
                report.push(channel_id, ChannelDisposition::NoAdapter, None);
                continue;
            };

            let message = OutboundMessage {
                recipient: recipient.to_string(),
                subject: render_at(&template.subject, variables, local_now),
                body: render_at(&template.body, variables, local_now),
            };
            let result = adapter.send(&project, &message).await;

            report.attempted += 1;
            match result.status {
                SendStatus::Sent => report.delivered += 1,
                SendStatus::Failed => {
                    report.failed += 1;
                    tracing::warn!(
                        %tenant,
                        event_type,
                        %channel,
                        error = result.error.as_deref().unwrap_or_default(),
                        "Notification send failed"
                    );
                }
            }

            let log = NewLog {
                event_type: event_type.to_string(),
                channel: channel.as_str().to_string(),
                recipient: recipient.to_string(),
                subject: template.subject.clone(),
                message: template.body.clone(),
                status: result.status.as_str().to_string(),
                external_id: result.external_id.clone(),
                error_message: result.error.clone(),
            };
            let log_id = match self.store.create_log(tenant, &log).await {
                Ok(row) => Some(row.id),
                Err(e) => {
                    tracing::error!(%tenant, event_type, %channel, error = %e, "Failed to write notification log");
                    report.record_error(e);
                    None
                }
            };

            report.push(channel_id, disposition(result), log_id);
        }

        report
    }

    /// Send one message outside any routing config. No log row is written;
    /// a provider failure is returned as [`NotifyError::Provider`].
    pub async fn send_manual(
        &self,
        tenant: Tenant,
        channel: &str,
        recipient: &str,
        variables: &HashMap<String, String>,
    ) -> NotifyResult<SendResult> {
        let channel: Channel = channel.parse()?;

        let project = self
            .directory
            .project(tenant)
            .await?
            .ok_or(NotifyError::ProjectNotFound(tenant))?;

        let template = self
            .store
            .find_active_template(tenant, channel)
            .await?
            .ok_or(NotifyError::TemplateNotFound { channel })?;

        let adapter = self
            .adapters
            .get(channel)
            .ok_or(NotifyError::AdapterMissing(channel))?;

        let local_now = self.local_now(&project, Utc::now());
        let message = OutboundMessage {
            recipient: recipient.to_string(),
            subject: render_at(&template.subject, variables, local_now),
            body: render_at(&template.body, variables, local_now),
        };

        let result = adapter.send(&project, &message).await;
        match result.status {
            SendStatus::Sent => {
                tracing::info!(%tenant, %channel, "Manual notification sent");
                Ok(result)
            }
            SendStatus::Failed => Err(NotifyError::Provider(
                result
                    .error
                    .unwrap_or_else(|| format!("{channel} send failed")),
            )),
        }
    }

    fn local_now(&self, project: &Project, now: DateTime<Utc>) -> chrono::NaiveDateTime {
        let tz = timezone::resolve(project.timezone.as_deref(), self.default_timezone);
        timezone::local_now(now, tz)
    }
}

fn disposition(result: SendResult) -> ChannelDisposition {
    match result.status {
        SendStatus::Sent => ChannelDisposition::Sent {
            external_id: result.external_id,
        },
        SendStatus::Failed => ChannelDisposition::Failed {
            error: result.error.unwrap_or_default(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, InMemoryDirectory, InMemoryStore, RecordingAdapter, Recorders};
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use comanda_core::event_types::RESERVATION_CREATE;

    const TENANT: Tenant = Tenant {
        org_id: 1,
        project_id: 10,
    };

    struct Harness {
        store: Arc<InMemoryStore>,
        recorders: Recorders,
        dispatcher: Dispatcher,
    }

    fn harness_with(registry: impl FnOnce(&Recorders) -> ChannelRegistry) -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_project(testing::project(TENANT));
        let recorders = Recorders::new();
        let dispatcher = Dispatcher::new(
            store.clone(),
            directory,
            registry(&recorders),
            timezone::FALLBACK_TIMEZONE,
        );
        Harness {
            store,
            recorders,
            dispatcher,
        }
    }

    fn harness() -> Harness {
        harness_with(Recorders::registry)
    }

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn phone_and_email() -> Recipients {
        Recipients::new(
            Some("+5511999990000".to_string()),
            Some("ana@example.com".to_string()),
        )
    }

    #[test]
    fn recipients_pick_address_by_channel() {
        let recipients = Recipients::new(Some(" +55 ".to_string()), Some("  ".to_string()));
        assert_eq!(recipients.for_channel(Channel::Sms), Some("+55"));
        assert_eq!(recipients.for_channel(Channel::Whatsapp), Some("+55"));
        assert_eq!(recipients.for_channel(Channel::Email), None);
        assert_eq!(recipients.addresses(), vec!["+55".to_string()]);
    }

    #[tokio::test]
    async fn missing_config_is_a_noop() {
        let h = harness();
        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;
        assert_eq!(report.skipped, Some(DispatchSkip::ConfigMissing));
        assert!(report.error.is_none());
        assert!(h.store.logs().is_empty());
    }

    #[tokio::test]
    async fn disabled_config_writes_no_logs() {
        let h = harness();
        h.store.seed_config(TENANT, RESERVATION_CREATE, false, &["sms", "email"]);
        h.store.seed_template(TENANT, "sms", "", "Olá");

        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;

        assert_eq!(report.skipped, Some(DispatchSkip::ConfigDisabled));
        assert_eq!(report.attempted, 0);
        assert!(h.store.logs().is_empty());
        assert!(h.recorders.sms.sent().is_empty());
    }

    #[tokio::test]
    async fn phone_only_customer_gets_exactly_one_sms_log() {
        let h = harness();
        h.store.seed_config(TENANT, RESERVATION_CREATE, true, &["sms", "email"]);
        h.store.seed_template(TENANT, "sms", "", "Olá {{customer_name}}");
        h.store.seed_template(TENANT, "email", "Reserva", "Olá {{customer_name}}");

        let recipients = Recipients::new(Some("+5511999990000".to_string()), None);
        let report = h
            .dispatcher
            .dispatch(
                TENANT,
                RESERVATION_CREATE,
                &recipients,
                &vars(&[("customer_name", "Ana")]),
            )
            .await;

        let logs = h.store.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].channel, "sms");
        assert_eq!(logs[0].status, "sent");
        assert_eq!(logs[0].recipient, "+5511999990000");
        assert_eq!(report.attempted, 1);
        assert_matches!(report.channels[1].disposition, ChannelDisposition::NoRecipient);
        assert!(h.recorders.email.sent().is_empty());
    }

    #[tokio::test]
    async fn log_keeps_pre_render_text_while_adapter_gets_rendered() {
        let h = harness();
        h.store.seed_config(TENANT, RESERVATION_CREATE, true, &["email"]);
        h.store
            .seed_template(TENANT, "email", "Reserva {{reservation_id}}", "Olá {{customer_name}} ({{data}})");

        // 15:00 UTC is 12:00 in São Paulo.
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 15, 0, 0).unwrap();
        h.dispatcher
            .dispatch_at(
                TENANT,
                RESERVATION_CREATE,
                &phone_and_email(),
                &vars(&[("customer_name", "Ana"), ("reservation_id", "7")]),
                now,
            )
            .await;

        let sent = h.recorders.email.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Reserva 7");
        assert_eq!(sent[0].body, "Olá Ana (07/03/2026)");

        let logs = h.store.logs();
        assert_eq!(logs[0].subject, "Reserva {{reservation_id}}");
        assert_eq!(logs[0].message, "Olá {{customer_name}} ({{data}})");
        assert_eq!(logs[0].external_id.as_deref(), Some("ext-email-1"));
    }

    #[tokio::test]
    async fn channel_without_template_is_skipped_but_others_dispatch() {
        let h = harness();
        h.store
            .seed_config(TENANT, RESERVATION_CREATE, true, &["whatsapp", "sms", "email"]);
        h.store.seed_template(TENANT, "sms", "", "sms body");
        h.store.seed_template(TENANT, "email", "s", "email body");

        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;

        let channels: Vec<_> = h.store.logs().into_iter().map(|l| l.channel).collect();
        assert_eq!(channels, vec!["sms", "email"]);
        assert_matches!(report.channels[0].disposition, ChannelDisposition::NoTemplate);
        assert_eq!(report.delivered, 2);
    }

    #[tokio::test]
    async fn failing_channel_does_not_abort_later_channels() {
        let failing = Arc::new(RecordingAdapter::failing(Channel::Sms, "sms provider not configured"));
        let h = harness_with(|r| r.registry().with(failing.clone()));
        h.store.seed_config(TENANT, RESERVATION_CREATE, true, &["sms", "email"]);
        h.store.seed_template(TENANT, "sms", "", "a");
        h.store.seed_template(TENANT, "email", "", "b");

        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;

        let logs = h.store.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].status, "failed");
        assert_eq!(logs[0].error_message.as_deref(), Some("sms provider not configured"));
        assert_eq!(logs[1].status, "sent");
        assert_eq!((report.attempted, report.delivered, report.failed), (2, 1, 1));
    }

    #[tokio::test]
    async fn unknown_channel_in_config_is_skipped() {
        let h = harness();
        h.store.seed_config(TENANT, RESERVATION_CREATE, true, &["fax", "sms"]);
        h.store.seed_template(TENANT, "sms", "", "a");

        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;

        assert_matches!(
            report.channels[0].disposition,
            ChannelDisposition::UnsupportedChannel
        );
        assert_eq!(h.store.logs().len(), 1);
    }

    #[tokio::test]
    async fn log_write_failure_is_reported_not_raised() {
        let h = harness();
        h.store.seed_config(TENANT, RESERVATION_CREATE, true, &["sms"]);
        h.store.seed_template(TENANT, "sms", "", "a");
        h.store.fail_log_writes(true);

        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;

        assert_eq!(report.delivered, 1);
        assert!(report.error.is_some());
        assert_eq!(report.channels[0].log_id, None);
        assert_eq!(h.recorders.sms.sent().len(), 1);
    }

    #[tokio::test]
    async fn most_recently_updated_active_template_wins() {
        let h = harness();
        h.store.seed_config(TENANT, RESERVATION_CREATE, true, &["sms"]);
        h.store.seed_template(TENANT, "sms", "", "older");
        h.store.seed_template(TENANT, "sms", "", "newer");

        h.dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;

        assert_eq!(h.recorders.sms.sent()[0].body, "newer");
    }

    #[tokio::test]
    async fn configs_do_not_cross_tenants() {
        let h = harness();
        let other = Tenant::new(1, 11);
        h.store.seed_config(other, RESERVATION_CREATE, true, &["sms"]);
        h.store.seed_template(other, "sms", "", "a");

        let report = h
            .dispatcher
            .dispatch(TENANT, RESERVATION_CREATE, &phone_and_email(), &HashMap::new())
            .await;
        assert_eq!(report.skipped, Some(DispatchSkip::ConfigMissing));
    }

    #[tokio::test]
    async fn manual_send_to_unsupported_channel_fails_without_log() {
        let h = harness();
        let err = h
            .dispatcher
            .send_manual(TENANT, "fax", "+5511", &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported channel: fax");
        assert!(h.store.logs().is_empty());
    }

    #[tokio::test]
    async fn manual_send_renders_and_writes_no_log() {
        let h = harness();
        h.store.seed_template(TENANT, "whatsapp", "", "Oi {{nome}}");

        let result = h
            .dispatcher
            .send_manual(TENANT, "whatsapp", "+5511", &vars(&[("nome", "Rui")]))
            .await
            .unwrap();

        assert!(result.is_sent());
        assert_eq!(h.recorders.whatsapp.sent()[0].body, "Oi Rui");
        assert!(h.store.logs().is_empty());
    }

    #[tokio::test]
    async fn manual_send_surfaces_missing_template_and_provider_errors() {
        let failing = Arc::new(RecordingAdapter::failing(Channel::Sms, "sms provider not configured"));
        let h = harness_with(|r| r.registry().with(failing.clone()));

        let err = h
            .dispatcher
            .send_manual(TENANT, "sms", "+5511", &HashMap::new())
            .await
            .unwrap_err();
        assert_matches!(err, NotifyError::TemplateNotFound { channel: Channel::Sms });

        h.store.seed_template(TENANT, "sms", "", "a");
        let err = h
            .dispatcher
            .send_manual(TENANT, "sms", "+5511", &HashMap::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "sms provider not configured");
        assert!(h.store.logs().is_empty());
    }
}
