//! Read access to the restaurant CRUD service's records.
//!
//! The engine needs project configuration (timezone, provider credentials,
//! notifiable-trigger flags) and the reservation, customer and table rows
//! that supply recipients and template variables.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use comanda_core::types::{DbId, Tenant};
use comanda_db::models::restaurant::{
    Customer, Project, ProjectSettings, Reservation, RestaurantTable,
};
use comanda_db::repositories::{CustomerRepo, ProjectRepo, ReservationRepo, TableRepo};
use comanda_db::DbPool;

use crate::store::StoreResult;

#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn project(&self, tenant: Tenant) -> StoreResult<Option<Project>>;

    /// Notification flags of a tenant; column defaults when no row exists.
    async fn settings(&self, tenant: Tenant) -> StoreResult<ProjectSettings>;

    async fn active_projects(&self) -> StoreResult<Vec<Project>>;

    async fn reservation(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<Reservation>>;

    /// Reservations whose local scheduled time lies within `[start, end]`.
    async fn reservations_between(
        &self,
        tenant: Tenant,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Reservation>>;

    async fn customer(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<Customer>>;

    async fn table(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<RestaurantTable>>;
}

/// PostgreSQL-backed [`TenantDirectory`].
#[derive(Clone)]
pub struct PgTenantDirectory {
    pool: DbPool,
}

impl PgTenantDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantDirectory for PgTenantDirectory {
    async fn project(&self, tenant: Tenant) -> StoreResult<Option<Project>> {
        ProjectRepo::find(&self.pool, tenant).await
    }

    async fn settings(&self, tenant: Tenant) -> StoreResult<ProjectSettings> {
        Ok(ProjectRepo::settings(&self.pool, tenant.project_id)
            .await?
            .unwrap_or_default())
    }

    async fn active_projects(&self) -> StoreResult<Vec<Project>> {
        ProjectRepo::list_active(&self.pool).await
    }

    async fn reservation(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<Reservation>> {
        ReservationRepo::find(&self.pool, tenant, id).await
    }

    async fn reservations_between(
        &self,
        tenant: Tenant,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> StoreResult<Vec<Reservation>> {
        ReservationRepo::list_scheduled_between(&self.pool, tenant, start, end).await
    }

    async fn customer(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<Customer>> {
        CustomerRepo::find(&self.pool, tenant, id).await
    }

    async fn table(&self, tenant: Tenant, id: DbId) -> StoreResult<Option<RestaurantTable>> {
        TableRepo::find(&self.pool, tenant, id).await
    }
}
