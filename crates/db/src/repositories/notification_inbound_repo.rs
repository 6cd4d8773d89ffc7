//! Repository for the `notification_inbound` table.

use comanda_core::types::Tenant;
use sqlx::PgPool;

use crate::models::notification::{NewInbound, NotificationInbound};

/// Column list for `notification_inbound` queries.
const COLUMNS: &str = "id, org_id, project_id, channel, from_address, to_address, body, \
                       external_id, processed, created_at";

pub struct NotificationInboundRepo;

impl NotificationInboundRepo {
    /// Record an inbound provider message as unprocessed.
    pub async fn create(
        pool: &PgPool,
        tenant: Tenant,
        input: &NewInbound,
    ) -> Result<NotificationInbound, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_inbound \
                (org_id, project_id, channel, from_address, to_address, body, external_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationInbound>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(&input.channel)
            .bind(&input.from_address)
            .bind(&input.to_address)
            .bind(&input.body)
            .bind(&input.external_id)
            .fetch_one(pool)
            .await
    }
}
