//! Repository for the `notification_events` table.

use comanda_core::types::{DbId, Tenant};
use sqlx::PgPool;

use crate::models::notification::{NewEvent, NotificationEvent};

/// Column list for `notification_events` queries.
const COLUMNS: &str = "id, org_id, project_id, event_type, entity_type, entity_id, data, \
                       processed, created_at, processed_at";

/// Provides insert, processed-marking and backlog listing for events.
pub struct NotificationEventRepo;

impl NotificationEventRepo {
    /// Insert an unprocessed event, returning the created row.
    pub async fn create(
        pool: &PgPool,
        tenant: Tenant,
        input: &NewEvent,
    ) -> Result<NotificationEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_events \
                (org_id, project_id, event_type, entity_type, entity_id, data) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationEvent>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(&input.event_type)
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(&input.data)
            .fetch_one(pool)
            .await
    }

    /// Set `processed = true` and stamp `processed_at`.
    pub async fn mark_processed(pool: &PgPool, event_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_events \
             SET processed = true, processed_at = NOW() \
             WHERE id = $1",
        )
        .bind(event_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List events still waiting to be processed, oldest first, across all
    /// tenants.
    pub async fn list_unprocessed(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<NotificationEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_events \
             WHERE NOT processed \
             ORDER BY created_at, id \
             LIMIT $1"
        );
        sqlx::query_as::<_, NotificationEvent>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
