//! Repository for the `notification_templates` table.

use comanda_core::types::{DbId, Tenant};
use sqlx::PgPool;

use crate::models::notification::{CreateTemplate, NotificationTemplate, UpdateTemplate};

/// Column list for `notification_templates` queries.
const COLUMNS: &str = "id, org_id, project_id, channel, name, subject, body, variables, \
                       active, created_at, updated_at";

/// Provides CRUD operations and active-template lookup.
pub struct NotificationTemplateRepo;

impl NotificationTemplateRepo {
    /// List all templates of a tenant, newest first.
    pub async fn list_for_tenant(
        pool: &PgPool,
        tenant: Tenant,
    ) -> Result<Vec<NotificationTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_templates \
             WHERE org_id = $1 AND project_id = $2 \
             ORDER BY updated_at DESC, id DESC"
        );
        sqlx::query_as::<_, NotificationTemplate>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .fetch_all(pool)
            .await
    }

    /// Find the active template for a (tenant, channel).
    ///
    /// When several templates are active the most recently updated one wins,
    /// with the highest id breaking ties.
    pub async fn find_active(
        pool: &PgPool,
        tenant: Tenant,
        channel: &str,
    ) -> Result<Option<NotificationTemplate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_templates \
             WHERE org_id = $1 AND project_id = $2 AND channel = $3 AND active \
             ORDER BY updated_at DESC, id DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, NotificationTemplate>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(channel)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new template, returning the created row.
    pub async fn create(
        pool: &PgPool,
        tenant: Tenant,
        input: &CreateTemplate,
    ) -> Result<NotificationTemplate, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_templates \
                (org_id, project_id, channel, name, subject, body, variables, active) \
             VALUES ($1, $2, $3, $4, COALESCE($5, ''), $6, COALESCE($7, '{{}}'), COALESCE($8, true)) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationTemplate>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(&input.channel)
            .bind(&input.name)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(&input.variables)
            .bind(input.active)
            .fetch_one(pool)
            .await
    }

    /// Update a tenant's template. Only non-`None` fields are applied.
    ///
    /// Returns `None` when no template with this id belongs to the tenant.
    pub async fn update(
        pool: &PgPool,
        tenant: Tenant,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<NotificationTemplate>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_templates SET \
                channel = COALESCE($4, channel), \
                name = COALESCE($5, name), \
                subject = COALESCE($6, subject), \
                body = COALESCE($7, body), \
                variables = COALESCE($8, variables), \
                active = COALESCE($9, active), \
                updated_at = NOW() \
             WHERE id = $1 AND org_id = $2 AND project_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationTemplate>(&query)
            .bind(id)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(&input.channel)
            .bind(&input.name)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(&input.variables)
            .bind(input.active)
            .fetch_optional(pool)
            .await
    }
}
