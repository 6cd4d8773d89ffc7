//! Repository for the `notification_configs` table.

use comanda_core::types::Tenant;
use sqlx::PgPool;

use crate::models::notification::{NotificationConfig, UpsertConfig};

/// Column list for `notification_configs` queries.
const COLUMNS: &str =
    "id, org_id, project_id, event_type, enabled, channels, created_at, updated_at";

/// Provides lookup and upsert for per-tenant routing configs.
pub struct NotificationConfigRepo;

impl NotificationConfigRepo {
    /// Find the config for a (tenant, event type).
    pub async fn find(
        pool: &PgPool,
        tenant: Tenant,
        event_type: &str,
    ) -> Result<Option<NotificationConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_configs \
             WHERE org_id = $1 AND project_id = $2 AND event_type = $3"
        );
        sqlx::query_as::<_, NotificationConfig>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(event_type)
            .fetch_optional(pool)
            .await
    }

    /// List every config of a tenant ordered by event type.
    pub async fn list_for_tenant(
        pool: &PgPool,
        tenant: Tenant,
    ) -> Result<Vec<NotificationConfig>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_configs \
             WHERE org_id = $1 AND project_id = $2 \
             ORDER BY event_type"
        );
        sqlx::query_as::<_, NotificationConfig>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .fetch_all(pool)
            .await
    }

    /// Create the config, or overwrite `enabled` and `channels` when one
    /// already exists. `id` and `created_at` of an existing row are kept.
    pub async fn upsert(
        pool: &PgPool,
        tenant: Tenant,
        input: &UpsertConfig,
    ) -> Result<NotificationConfig, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_configs \
                (org_id, project_id, event_type, enabled, channels) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (org_id, project_id, event_type) DO UPDATE SET \
                enabled = EXCLUDED.enabled, \
                channels = EXCLUDED.channels, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationConfig>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(&input.event_type)
            .bind(input.enabled)
            .bind(&input.channels)
            .fetch_one(pool)
            .await
    }
}
