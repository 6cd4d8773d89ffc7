//! In-memory collaborators for tests.
//!
//! [`InMemoryStore`] and [`InMemoryDirectory`] implement the storage and
//! directory traits over plain vectors; [`RecordingAdapter`] captures every
//! message instead of calling a provider. Enabled by the `testing` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use comanda_core::channels::Channel;
use comanda_core::log_status;
use comanda_core::types::{DbId, Tenant, Timestamp};
use comanda_db::models::notification::{
    CreateTemplate, NewEvent, NewInbound, NewLog, NotificationConfig, NotificationEvent,
    NotificationInbound, NotificationLog, NotificationTemplate, UpdateTemplate, UpsertConfig,
};
use comanda_db::models::restaurant::{
    Customer, Project, ProjectSettings, Reservation, RestaurantTable,
};

use crate::channels::{ChannelAdapter, ChannelRegistry, OutboundMessage, SendResult};
use crate::directory::TenantDirectory;
use crate::store::{NotificationStore, StoreResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct StoreState {
    next_id: DbId,
    configs: Vec<NotificationConfig>,
    templates: Vec<NotificationTemplate>,
    events: Vec<NotificationEvent>,
    logs: Vec<NotificationLog>,
    inbound: Vec<NotificationInbound>,
    fail_log_writes: bool,
}

impl StoreState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }
}

/// [`NotificationStore`] over in-process vectors.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<NotificationLog> {
        lock(&self.state).logs.clone()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        lock(&self.state).events.clone()
    }

    pub fn inbound(&self) -> Vec<NotificationInbound> {
        lock(&self.state).inbound.clone()
    }

    /// Make every subsequent `create_log` fail with a pool error.
    pub fn fail_log_writes(&self, fail: bool) {
        lock(&self.state).fail_log_writes = fail;
    }

    pub fn seed_config(
        &self,
        tenant: Tenant,
        event_type: &str,
        enabled: bool,
        channels: &[&str],
    ) -> NotificationConfig {
        let mut state = lock(&self.state);
        let now = Utc::now();
        let config = NotificationConfig {
            id: state.next_id(),
            org_id: tenant.org_id,
            project_id: tenant.project_id,
            event_type: event_type.to_string(),
            enabled,
            channels: channels.iter().map(|c| c.to_string()).collect(),
            created_at: now,
            updated_at: now,
        };
        state.configs.push(config.clone());
        config
    }

    /// Insert an active template.
    pub fn seed_template(
        &self,
        tenant: Tenant,
        channel: &str,
        subject: &str,
        body: &str,
    ) -> NotificationTemplate {
        let mut state = lock(&self.state);
        let now = Utc::now();
        let template = NotificationTemplate {
            id: state.next_id(),
            org_id: tenant.org_id,
            project_id: tenant.project_id,
            channel: channel.to_string(),
            name: format!("{channel} template"),
            subject: subject.to_string(),
            body: body.to_string(),
            variables: Vec::new(),
            active: true,
            created_at: now,
            updated_at: now,
        };
        state.templates.push(template.clone());
        template
    }

    /// Insert an unprocessed event without dispatching it.
    pub fn seed_event(&self, tenant: Tenant, input: NewEvent) -> NotificationEvent {
        let mut state = lock(&self.state);
        let event = NotificationEvent {
            id: state.next_id(),
            org_id: tenant.org_id,
            project_id: tenant.project_id,
            event_type: input.event_type,
            entity_type: input.entity_type,
            entity_id: input.entity_id,
            data: input.data,
            processed: false,
            created_at: Utc::now(),
            processed_at: None,
        };
        state.events.push(event.clone());
        event
    }

    /// Insert a log row with an explicit creation time.
    pub fn seed_log_at(
        &self,
        tenant: Tenant,
        input: &NewLog,
        created_at: Timestamp,
    ) -> NotificationLog {
        let mut state = lock(&self.state);
        let log = build_log(state.next_id(), tenant, input, created_at);
        state.logs.push(log.clone());
        log
    }
}

fn build_log(id: DbId, tenant: Tenant, input: &NewLog, created_at: Timestamp) -> NotificationLog {
    NotificationLog {
        id,
        org_id: tenant.org_id,
        project_id: tenant.project_id,
        event_type: input.event_type.clone(),
        channel: input.channel.clone(),
        recipient: input.recipient.clone(),
        subject: input.subject.clone(),
        message: input.message.clone(),
        status: input.status.clone(),
        external_id: input.external_id.clone(),
        error_message: input.error_message.clone(),
        created_at,
        updated_at: created_at,
        delivered_at: None,
    }
}

fn owned_by(tenant: Tenant, org_id: DbId, project_id: DbId) -> bool {
    tenant.org_id == org_id && tenant.project_id == project_id
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn find_config(
        &self,
        tenant: Tenant,
        event_type: &str,
    ) -> StoreResult<Option<NotificationConfig>> {
        Ok(lock(&self.state)
            .configs
            .iter()
            .find(|c| owned_by(tenant, c.org_id, c.project_id) && c.event_type == event_type)
            .cloned())
    }

    async fn list_configs(&self, tenant: Tenant) -> StoreResult<Vec<NotificationConfig>> {
        Ok(lock(&self.state)
            .configs
            .iter()
            .filter(|c| owned_by(tenant, c.org_id, c.project_id))
            .cloned()
            .collect())
    }

    async fn upsert_config(
        &self,
        tenant: Tenant,
        input: &UpsertConfig,
    ) -> StoreResult<NotificationConfig> {
        let mut state = lock(&self.state);
        let now = Utc::now();
        if let Some(existing) = state.configs.iter_mut().find(|c| {
            owned_by(tenant, c.org_id, c.project_id) && c.event_type == input.event_type
        }) {
            existing.enabled = input.enabled;
            existing.channels = input.channels.clone();
            existing.updated_at = now;
            return Ok(existing.clone());
        }
        let config = NotificationConfig {
            id: state.next_id(),
            org_id: tenant.org_id,
            project_id: tenant.project_id,
            event_type: input.event_type.clone(),
            enabled: input.enabled,
            channels: input.channels.clone(),
            created_at: now,
            updated_at: now,
        };
        state.configs.push(config.clone());
        Ok(config)
    }

    async fn list_templates(&self, tenant: Tenant) -> StoreResult<Vec<NotificationTemplate>> {
        let mut templates: Vec<_> = lock(&self.state)
            .templates
            .iter()
            .filter(|t| owned_by(tenant, t.org_id, t.project_id))
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(templates)
    }

    async fn find_active_template(
        &self,
        tenant: Tenant,
        channel: Channel,
    ) -> StoreResult<Option<NotificationTemplate>> {
        Ok(lock(&self.state)
            .templates
            .iter()
            .filter(|t| {
                owned_by(tenant, t.org_id, t.project_id)
                    && t.active
                    && t.channel == channel.as_str()
            })
            .max_by(|a, b| a.updated_at.cmp(&b.updated_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn create_template(
        &self,
        tenant: Tenant,
        input: &CreateTemplate,
    ) -> StoreResult<NotificationTemplate> {
        let mut state = lock(&self.state);
        let now = Utc::now();
        let template = NotificationTemplate {
            id: state.next_id(),
            org_id: tenant.org_id,
            project_id: tenant.project_id,
            channel: input.channel.clone(),
            name: input.name.clone(),
            subject: input.subject.clone().unwrap_or_default(),
            body: input.body.clone(),
            variables: input.variables.clone().unwrap_or_default(),
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        state.templates.push(template.clone());
        Ok(template)
    }

    async fn update_template(
        &self,
        tenant: Tenant,
        id: DbId,
        input: &UpdateTemplate,
    ) -> StoreResult<Option<NotificationTemplate>> {
        let mut state = lock(&self.state);
        let Some(template) = state
            .templates
            .iter_mut()
            .find(|t| t.id == id && owned_by(tenant, t.org_id, t.project_id))
        else {
            return Ok(None);
        };
        if let Some(channel) = &input.channel {
            template.channel = channel.clone();
        }
        if let Some(name) = &input.name {
            template.name = name.clone();
        }
        if let Some(subject) = &input.subject {
            template.subject = subject.clone();
        }
        if let Some(body) = &input.body {
            template.body = body.clone();
        }
        if let Some(variables) = &input.variables {
            template.variables = variables.clone();
        }
        if let Some(active) = input.active {
            template.active = active;
        }
        template.updated_at = Utc::now();
        Ok(Some(template.clone()))
    }

    async fn create_event(
        &self,
        tenant: Tenant,
        input: &NewEvent,
    ) -> StoreResult<NotificationEvent> {
        Ok(self.seed_event(tenant, input.clone()))
    }

    async fn mark_event_processed(&self, event_id: DbId) -> StoreResult<()> {
        let mut state = lock(&self.state);
        if let Some(event) = state.events.iter_mut().find(|e| e.id == event_id) {
            event.processed = true;
            event.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_unprocessed_events(&self, limit: i64) -> StoreResult<Vec<NotificationEvent>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(lock(&self.state)
            .events
            .iter()
            .filter(|e| !e.processed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn create_log(&self, tenant: Tenant, input: &NewLog) -> StoreResult<NotificationLog> {
        let mut state = lock(&self.state);
        if state.fail_log_writes {
            return Err(sqlx::Error::PoolClosed);
        }
        let log = build_log(state.next_id(), tenant, input, Utc::now());
        state.logs.push(log.clone());
        Ok(log)
    }

    async fn list_recent_logs(
        &self,
        tenant: Tenant,
        limit: i64,
    ) -> StoreResult<Vec<NotificationLog>> {
        let mut logs: Vec<_> = lock(&self.state)
            .logs
            .iter()
            .filter(|l| owned_by(tenant, l.org_id, l.project_id))
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        logs.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(logs)
    }

    async fn log_exists_since(
        &self,
        tenant: Tenant,
        event_type: &str,
        excluded_statuses: &[&str],
        since: Timestamp,
    ) -> StoreResult<bool> {
        Ok(lock(&self.state).logs.iter().any(|l| {
            owned_by(tenant, l.org_id, l.project_id)
                && l.event_type == event_type
                && !excluded_statuses.contains(&l.status.as_str())
                && l.created_at >= since
        }))
    }

    async fn apply_provider_status(
        &self,
        external_id: &str,
        provider_status: &str,
        error_message: Option<&str>,
    ) -> StoreResult<u64> {
        let mut state = lock(&self.state);
        let now = Utc::now();
        let mut matched = 0;
        for log in state
            .logs
            .iter_mut()
            .filter(|l| l.external_id.as_deref() == Some(external_id))
        {
            if log_status::is_delivered_class(provider_status) {
                log.status = log_status::DELIVERED.to_string();
                log.delivered_at = Some(now);
            } else {
                log.status = provider_status.to_string();
            }
            if let Some(message) = error_message {
                log.error_message = Some(message.to_string());
            }
            log.updated_at = now;
            matched += 1;
        }
        Ok(matched)
    }

    async fn create_inbound(
        &self,
        tenant: Tenant,
        input: &NewInbound,
    ) -> StoreResult<NotificationInbound> {
        let mut state = lock(&self.state);
        let inbound = NotificationInbound {
            id: state.next_id(),
            org_id: tenant.org_id,
            project_id: tenant.project_id,
            channel: input.channel.clone(),
            from_address: input.from_address.clone(),
            to_address: input.to_address.clone(),
            body: input.body.clone(),
            external_id: input.external_id.clone(),
            processed: false,
            created_at: Utc::now(),
        };
        state.inbound.push(inbound.clone());
        Ok(inbound)
    }
}

// ---------------------------------------------------------------------------
// InMemoryDirectory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct DirectoryState {
    projects: Vec<Project>,
    settings: HashMap<DbId, ProjectSettings>,
    customers: Vec<(Tenant, Customer)>,
    tables: Vec<(Tenant, RestaurantTable)>,
    reservations: Vec<Reservation>,
}

/// [`TenantDirectory`] over in-process vectors.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<DirectoryState>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, project: Project) {
        lock(&self.state).projects.push(project);
    }

    pub fn set_settings(&self, tenant: Tenant, settings: ProjectSettings) {
        lock(&self.state).settings.insert(tenant.project_id, settings);
    }

    pub fn add_customer(&self, tenant: Tenant, customer: Customer) {
        lock(&self.state).customers.push((tenant, customer));
    }

    pub fn add_table(&self, tenant: Tenant, table: RestaurantTable) {
        lock(&self.state).tables.push((tenant, table));
    }

    pub fn add_reservation(&self, reservation: Reservation) {
        lock(&self.state).reservations.push(reservation);
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn project(&self, tenant: Tenant) -> StoreResult<Option<Project>> {
        Ok(lock(&self.state)
            .projects
            .iter()
            .find(|p| p.tenant() == tenant)
            .cloned())
    }

    async fn settings(&self, tenant: Tenant) -> StoreResult<ProjectSettings> {
        Ok(lock(&self.state)
            .settings
            .get(&tenant.project_id)
            .copied()
            .unwrap_or_default())
    }

    async fn active_projects(&self) -> StoreResult<Vec<Project>> {
        Ok(lock(&self.state)
            .projects
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect())
    }

    async fn reservation(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<Reservation>> {
        Ok(lock(&self.state)
            .reservations
            .iter()
            .find(|r| r.id == id && owned_by(tenant, r.org_id, r.project_id))
            .cloned())
    }

    async fn reservations_between(
        &self,
        tenant: Tenant,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Reservation>> {
        let mut found: Vec<_> = lock(&self.state)
            .reservations
            .iter()
            .filter(|r| {
                owned_by(tenant, r.org_id, r.project_id)
                    && r.scheduled_at() >= start
                    && r.scheduled_at() <= end
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.scheduled_at(), r.id));
        Ok(found)
    }

    async fn customer(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<Customer>> {
        Ok(lock(&self.state)
            .customers
            .iter()
            .find(|(t, c)| *t == tenant && c.id == id)
            .map(|(_, c)| c.clone()))
    }

    async fn table(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<RestaurantTable>> {
        Ok(lock(&self.state)
            .tables
            .iter()
            .find(|(t, table)| *t == tenant && table.id == id)
            .map(|(_, table)| table.clone()))
    }
}

// ---------------------------------------------------------------------------
// RecordingAdapter
// ---------------------------------------------------------------------------

/// Channel adapter that records messages and answers with a fixed outcome.
pub struct RecordingAdapter {
    channel: Channel,
    failure: Option<String>,
    sent: Mutex<Vec<OutboundMessage>>,
}

impl RecordingAdapter {
    /// Accepts every message, answering with `ext-<channel>-<n>` ids.
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            failure: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Rejects every message with `error`.
    pub fn failing(channel: Channel, error: &str) -> Self {
        Self {
            failure: Some(error.to_string()),
            ..Self::new(channel)
        }
    }

    pub fn sent(&self) -> Vec<OutboundMessage> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl ChannelAdapter for RecordingAdapter {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, _project: &Project, message: &OutboundMessage) -> SendResult {
        let mut sent = lock(&self.sent);
        sent.push(message.clone());
        match &self.failure {
            Some(error) => SendResult::failed(error.clone()),
            None => SendResult::sent(Some(format!("ext-{}-{}", self.channel, sent.len()))),
        }
    }
}

/// One recording adapter per channel.
pub struct Recorders {
    pub sms: Arc<RecordingAdapter>,
    pub email: Arc<RecordingAdapter>,
    pub whatsapp: Arc<RecordingAdapter>,
}

impl Recorders {
    pub fn new() -> Self {
        Self {
            sms: Arc::new(RecordingAdapter::new(Channel::Sms)),
            email: Arc::new(RecordingAdapter::new(Channel::Email)),
            whatsapp: Arc::new(RecordingAdapter::new(Channel::Whatsapp)),
        }
    }

    pub fn registry(&self) -> ChannelRegistry {
        ChannelRegistry::new()
            .with(self.sms.clone())
            .with(self.email.clone())
            .with(self.whatsapp.clone())
    }
}

impl Default for Recorders {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// An active project for `tenant` with placeholder provider credentials.
pub fn project(tenant: Tenant) -> Project {
    Project {
        id: tenant.project_id,
        org_id: tenant.org_id,
        name: "Cantina da Praça".to_string(),
        timezone: Some("America/Sao_Paulo".to_string()),
        is_active: true,
        twilio_account_sid: Some("AC-test".to_string()),
        twilio_auth_token: Some("token".to_string()),
        twilio_phone_number: Some("+15550001111".to_string()),
        whatsapp_number: None,
        smtp_host: Some("smtp.test".to_string()),
        smtp_port: Some(587),
        smtp_username: None,
        smtp_password: None,
        smtp_from: Some("reservas@cantina.test".to_string()),
    }
}

pub fn customer(id: DbId, phone: Option<&str>, email: Option<&str>) -> Customer {
    Customer {
        id,
        name: "Ana Souza".to_string(),
        phone: phone.map(str::to_string),
        email: email.map(str::to_string),
    }
}

/// A confirmed reservation for a party of four at table 1.
pub fn reservation(tenant: Tenant, id: DbId, customer_id: DbId, at: NaiveDateTime) -> Reservation {
    Reservation {
        id,
        org_id: tenant.org_id,
        project_id: tenant.project_id,
        customer_id,
        table_id: Some(1),
        reservation_date: at.date(),
        reservation_time: at.time(),
        party_size: 4,
        status: comanda_db::models::restaurant::RESERVATION_STATUS_CONFIRMED.to_string(),
        notes: None,
    }
}

pub fn table(id: DbId, label: &str) -> RestaurantTable {
    RestaurantTable {
        id,
        label: label.to_string(),
        capacity: 4,
    }
}
