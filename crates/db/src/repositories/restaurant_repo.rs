//! Read-only repositories over the restaurant CRUD tables.

use chrono::NaiveDateTime;
use comanda_core::types::{DbId, Tenant};
use sqlx::PgPool;

use crate::models::restaurant::{Customer, Project, ProjectSettings, Reservation, RestaurantTable};

/// Column list for `projects` queries.
const PROJECT_COLUMNS: &str = "id, org_id, name, timezone, is_active, twilio_account_sid, \
                               twilio_auth_token, twilio_phone_number, whatsapp_number, \
                               smtp_host, smtp_port, smtp_username, smtp_password, smtp_from";

/// Column list for `project_settings` queries.
const SETTINGS_COLUMNS: &str = "notify_reservation_create, notify_reservation_update, \
                                notify_reservation_cancel, notify_table_available, \
                                notify_confirmation_24h";

/// Column list for `reservations` queries.
const RESERVATION_COLUMNS: &str = "id, org_id, project_id, customer_id, table_id, \
                                   reservation_date, reservation_time, party_size, status, notes";

pub struct ProjectRepo;

impl ProjectRepo {
    /// Find the project identified by a tenant.
    pub async fn find(pool: &PgPool, tenant: Tenant) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND org_id = $2"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(tenant.project_id)
            .bind(tenant.org_id)
            .fetch_optional(pool)
            .await
    }

    /// List every active project, ordered by id.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE is_active ORDER BY id"
        );
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Notification flags of a project, or `None` if no settings row exists.
    pub async fn settings(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Option<ProjectSettings>, sqlx::Error> {
        let query = format!(
            "SELECT {SETTINGS_COLUMNS} FROM project_settings WHERE project_id = $1"
        );
        sqlx::query_as::<_, ProjectSettings>(&query)
            .bind(project_id)
            .fetch_optional(pool)
            .await
    }
}

pub struct CustomerRepo;

impl CustomerRepo {
    pub async fn find(
        pool: &PgPool,
        tenant: Tenant,
        id: DbId,
    ) -> Result<Option<Customer>, sqlx::Error> {
        sqlx::query_as::<_, Customer>(
            "SELECT id, name, phone, email FROM customers \
             WHERE id = $1 AND org_id = $2 AND project_id = $3",
        )
        .bind(id)
        .bind(tenant.org_id)
        .bind(tenant.project_id)
        .fetch_optional(pool)
        .await
    }
}

pub struct TableRepo;

impl TableRepo {
    pub async fn find(
        pool: &PgPool,
        tenant: Tenant,
        id: DbId,
    ) -> Result<Option<RestaurantTable>, sqlx::Error> {
        sqlx::query_as::<_, RestaurantTable>(
            "SELECT id, label, capacity FROM restaurant_tables \
             WHERE id = $1 AND org_id = $2 AND project_id = $3",
        )
        .bind(id)
        .bind(tenant.org_id)
        .bind(tenant.project_id)
        .fetch_optional(pool)
        .await
    }
}

pub struct ReservationRepo;

impl ReservationRepo {
    pub async fn find(
        pool: &PgPool,
        tenant: Tenant,
        id: DbId,
    ) -> Result<Option<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE id = $1 AND org_id = $2 AND project_id = $3"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(id)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .fetch_optional(pool)
            .await
    }

    /// Reservations of a tenant whose local scheduled time falls within
    /// `[start, end]`, ordered by schedule.
    pub async fn list_scheduled_between(
        pool: &PgPool,
        tenant: Tenant,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Reservation>, sqlx::Error> {
        let query = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations \
             WHERE org_id = $1 AND project_id = $2 \
               AND (reservation_date + reservation_time) BETWEEN $3 AND $4 \
             ORDER BY reservation_date, reservation_time, id"
        );
        sqlx::query_as::<_, Reservation>(&query)
            .bind(tenant.org_id)
            .bind(tenant.project_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool)
            .await
    }
}
