//! Repository for the `notification_logs` table.

use comanda_core::log_status;
use comanda_core::types::{Tenant, Timestamp};
use sqlx::PgPool;

use crate::models::notification::{NewLog, NotificationLog};

/// Column list for `notification_logs` queries.
const COLUMNS: &str = "id, org_id, project_id, event_type, channel, recipient, subject, \
                       message, status, external_id, error_message, created_at, updated_at, \
                       delivered_at";

/// Provides append, listing and webhook status reconciliation for logs.
pub struct NotificationLogRepo;

impl NotificationLogRepo {
    /// Append a log row, returning the created row.
    pub async fn create(
        pool: &PgPool,
        tenant: Tenant,
        input: &NewLog,
    ) -> Result<NotificationLog, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_logs \
                (org_id, project_id, event_type, channel, recipient, subject, message, \
                 status, external_id, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(&input.event_type)
            .bind(&input.channel)
            .bind(&input.recipient)
            .bind(&input.subject)
            .bind(&input.message)
            .bind(&input.status)
            .bind(&input.external_id)
            .bind(&input.error_message)
            .fetch_one(pool)
            .await
    }

    /// Most recent logs of a tenant.
    pub async fn list_recent(
        pool: &PgPool,
        tenant: Tenant,
        limit: i64,
    ) -> Result<Vec<NotificationLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_logs \
             WHERE org_id = $1 AND project_id = $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, NotificationLog>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Whether the tenant has a log with `event_type` written at or after
    /// `since` whose current status is not one of `excluded_statuses`.
    pub async fn exists_since(
        pool: &PgPool,
        tenant: Tenant,
        event_type: &str,
        excluded_statuses: &[&str],
        since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM notification_logs \
                WHERE org_id = $1 AND project_id = $2 \
                  AND event_type = $3 \
                  AND status <> ALL($4) \
                  AND created_at >= $5 \
             )",
        )
        .bind(tenant.org_id)
        .bind(tenant.project_id)
        .bind(event_type)
        .bind(excluded_statuses)
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Apply a provider status callback to every log carrying `external_id`.
    ///
    /// A delivered-class status sets `status = 'delivered'` and stamps
    /// `delivered_at`; any other value is stored verbatim and leaves
    /// `delivered_at` untouched. `error_message` is only overwritten when
    /// the callback carries one. Returns the number of rows updated.
    pub async fn apply_provider_status(
        pool: &PgPool,
        external_id: &str,
        provider_status: &str,
        error_message: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let result = if log_status::is_delivered_class(provider_status) {
            sqlx::query(
                "UPDATE notification_logs SET \
                    status = $2, \
                    delivered_at = NOW(), \
                    error_message = COALESCE($3, error_message), \
                    updated_at = NOW() \
                 WHERE external_id = $1",
            )
            .bind(external_id)
            .bind(log_status::DELIVERED)
            .bind(error_message)
            .execute(pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE notification_logs SET \
                    status = $2, \
                    error_message = COALESCE($3, error_message), \
                    updated_at = NOW() \
                 WHERE external_id = $1",
            )
            .bind(external_id)
            .bind(provider_status)
            .bind(error_message)
            .execute(pool)
            .await?
        };
        Ok(result.rows_affected())
    }
}
