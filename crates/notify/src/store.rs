//! Storage seam for notification configs, templates, events, logs and
//! inbound messages.
//!
//! [`PgNotificationStore`] delegates to the `comanda_db` repositories. The
//! trait exists so the dispatcher, processor and sweeps can be exercised
//! against the in-memory store in [`crate::testing`].

use async_trait::async_trait;
use comanda_core::channels::Channel;
use comanda_core::types::{DbId, Tenant, Timestamp};
use comanda_db::models::notification::{
    CreateTemplate, NewEvent, NewInbound, NewLog, NotificationConfig, NotificationEvent,
    NotificationInbound, NotificationLog, NotificationTemplate, UpdateTemplate, UpsertConfig,
};
use comanda_db::repositories::{
    NotificationConfigRepo, NotificationEventRepo, NotificationInboundRepo, NotificationLogRepo,
    NotificationTemplateRepo,
};
use comanda_db::DbPool;

pub type StoreResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn find_config(
        &self,
        tenant: Tenant,
        event_type: &str,
    ) -> StoreResult<Option<NotificationConfig>>;

    async fn list_configs(&self, tenant: Tenant) -> StoreResult<Vec<NotificationConfig>>;

    async fn upsert_config(
        &self,
        tenant: Tenant,
        input: &UpsertConfig,
    ) -> StoreResult<NotificationConfig>;

    async fn list_templates(&self, tenant: Tenant) -> StoreResult<Vec<NotificationTemplate>>;

    /// The active template for a (tenant, channel); most recently updated
    /// wins when several are active.
    async fn find_active_template(
        &self,
        tenant: Tenant,
        channel: Channel,
    ) -> StoreResult<Option<NotificationTemplate>>;

    async fn create_template(
        &self,
        tenant: Tenant,
        input: &CreateTemplate,
    ) -> StoreResult<NotificationTemplate>;

    async fn update_template(
        &self,
        tenant: Tenant,
        id: DbId,
        input: &UpdateTemplate,
    ) -> StoreResult<Option<NotificationTemplate>>;

    async fn create_event(&self, tenant: Tenant, input: &NewEvent)
        -> StoreResult<NotificationEvent>;

    async fn mark_event_processed(&self, event_id: DbId) -> StoreResult<()>;

    async fn list_unprocessed_events(&self, limit: i64) -> StoreResult<Vec<NotificationEvent>>;

    async fn create_log(&self, tenant: Tenant, input: &NewLog) -> StoreResult<NotificationLog>;

    async fn list_recent_logs(
        &self,
        tenant: Tenant,
        limit: i64,
    ) -> StoreResult<Vec<NotificationLog>>;

    /// Whether the tenant has a log with `event_type` created at or after
    /// `since` whose current status is not in `excluded_statuses`.
    async fn log_exists_since(
        &self,
        tenant: Tenant,
        event_type: &str,
        excluded_statuses: &[&str],
        since: Timestamp,
    ) -> StoreResult<bool>;

    /// Apply a provider status to the logs carrying `external_id`,
    /// returning how many rows matched.
    async fn apply_provider_status(
        &self,
        external_id: &str,
        provider_status: &str,
        error_message: Option<&str>,
    ) -> StoreResult<u64>;

    async fn create_inbound(
        &self,
        tenant: Tenant,
        input: &NewInbound,
    ) -> StoreResult<NotificationInbound>;
}

/// PostgreSQL-backed [`NotificationStore`].
#[derive(Clone)]
pub struct PgNotificationStore {
    pool: DbPool,
}

impl PgNotificationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn find_config(
        &self,
        tenant: Tenant,
        event_type: &str,
    ) -> StoreResult<Option<NotificationConfig>> {
        NotificationConfigRepo::find(&self.pool, tenant, event_type).await
    }

    async fn list_configs(&self, tenant: Tenant) -> StoreResult<Vec<NotificationConfig>> {
        NotificationConfigRepo::list_for_tenant(&self.pool, tenant).await
    }

    async fn upsert_config(
        &self,
        tenant: Tenant,
        input: &UpsertConfig,
    ) -> StoreResult<NotificationConfig> {
        NotificationConfigRepo::upsert(&self.pool, tenant, input).await
    }

    async fn list_templates(&self, tenant: Tenant) -> StoreResult<Vec<NotificationTemplate>> {
        NotificationTemplateRepo::list_for_tenant(&self.pool, tenant).await
    }

    async fn find_active_template(
        &self,
        tenant: Tenant,
        channel: Channel,
    ) -> StoreResult<Option<NotificationTemplate>> {
        NotificationTemplateRepo::find_active(&self.pool, tenant, channel.as_str()).await
    }

    async fn create_template(
        &self,
        tenant: Tenant,
        input: &CreateTemplate,
    ) -> StoreResult<NotificationTemplate> {
        NotificationTemplateRepo::create(&self.pool, tenant, input).await
    }

    async fn update_template(
        &self,
        tenant: Tenant,
        id: DbId,
        input: &UpdateTemplate,
    ) -> StoreResult<Option<NotificationTemplate>> {
        NotificationTemplateRepo::update(&self.pool, tenant, id, input).await
    }

    async fn create_event(
        &self,
        tenant: Tenant,
        input: &NewEvent,
    ) -> StoreResult<NotificationEvent> {
        NotificationEventRepo::create(&self.pool, tenant, input).await
    }

    async fn mark_event_processed(&self, event_id: DbId) -> StoreResult<()> {
        NotificationEventRepo::mark_processed(&self.pool, event_id).await
    }

    async fn list_unprocessed_events(&self, limit: i64) -> StoreResult<Vec<NotificationEvent>> {
        NotificationEventRepo::list_unprocessed(&self.pool, limit).await
    }

    async fn create_log(&self, tenant: Tenant, input: &NewLog) -> StoreResult<NotificationLog> {
        NotificationLogRepo::create(&self.pool, tenant, input).await
    }

    async fn list_recent_logs(
        &self,
        tenant: Tenant,
        limit: i64,
    ) -> StoreResult<Vec<NotificationLog>> {
        NotificationLogRepo::list_recent(&self.pool, tenant, limit).await
    }

    async fn log_exists_since(
        &self,
        tenant: Tenant,
        event_type: &str,
        excluded_statuses: &[&str],
        since: Timestamp,
    ) -> StoreResult<bool> {
        NotificationLogRepo::exists_since(&self.pool, tenant, event_type, excluded_statuses, since)
            .await
    }

    async fn apply_provider_status(
        &self,
        external_id: &str,
        provider_status: &str,
        error_message: Option<&str>,
    ) -> StoreResult<u64> {
        NotificationLogRepo::apply_provider_status(
            &self.pool,
            external_id,
            provider_status,
            error_message,
        )
        .await
    }

    async fn create_inbound(
        &self,
        tenant: Tenant,
        input: &NewInbound,
    ) -> StoreResult<NotificationInbound> {
        NotificationInboundRepo::create(&self.pool, tenant, input).await
    }
}
