//! Read models of the tables owned by the restaurant CRUD service.
//!
//! The notification engine never writes these rows.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use comanda_core::types::{DbId, Tenant};
use sqlx::FromRow;

/// Reservation status that makes a reservation eligible for the 24h reminder.
pub const RESERVATION_STATUS_CONFIRMED: &str = "confirmed";

/// A row from the `projects` table, restricted to the columns the engine
/// needs: timezone and per-tenant provider credentials.
#[derive(Debug, Clone, FromRow)]
pub struct Project {
    pub id: DbId,
    pub org_id: DbId,
    pub name: String,
    /// IANA timezone name; `None` falls back to the engine default.
    pub timezone: Option<String>,
    pub is_active: bool,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    /// Sending number for WhatsApp; `None` reuses `twilio_phone_number`.
    pub whatsapp_number: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: Option<String>,
}

impl Project {
    pub fn tenant(&self) -> Tenant {
        Tenant::new(self.org_id, self.id)
    }
}

/// A row from the `project_settings` table: which triggers are notifiable.
#[derive(Debug, Clone, Copy, FromRow, PartialEq, Eq)]
pub struct ProjectSettings {
    pub notify_reservation_create: bool,
    pub notify_reservation_update: bool,
    pub notify_reservation_cancel: bool,
    pub notify_table_available: bool,
    pub notify_confirmation_24h: bool,
}

impl Default for ProjectSettings {
    /// Matches the column defaults of `project_settings`.
    fn default() -> Self {
        Self {
            notify_reservation_create: true,
            notify_reservation_update: true,
            notify_reservation_cancel: true,
            notify_table_available: true,
            notify_confirmation_24h: false,
        }
    }
}

/// A row from the `customers` table.
#[derive(Debug, Clone, FromRow)]
pub struct Customer {
    pub id: DbId,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A row from the `restaurant_tables` table.
#[derive(Debug, Clone, FromRow)]
pub struct RestaurantTable {
    pub id: DbId,
    pub label: String,
    pub capacity: i32,
}

/// A row from the `reservations` table. Date and time are local to the
/// project's timezone.
#[derive(Debug, Clone, FromRow)]
pub struct Reservation {
    pub id: DbId,
    pub org_id: DbId,
    pub project_id: DbId,
    pub customer_id: DbId,
    pub table_id: Option<DbId>,
    pub reservation_date: NaiveDate,
    pub reservation_time: NaiveTime,
    pub party_size: i32,
    pub status: String,
    pub notes: Option<String>,
}

impl Reservation {
    /// Scheduled local date and time.
    pub fn scheduled_at(&self) -> NaiveDateTime {
        self.reservation_date.and_time(self.reservation_time)
    }
}

impl ProjectSettings {
    /// Whether the tenant flag for `event_type` allows notifications.
    ///
    /// Event types without a dedicated flag are always allowed.
    pub fn allows(&self, event_type: &str) -> bool {
        use comanda_core::event_types::*;
        match event_type {
            RESERVATION_CREATE => self.notify_reservation_create,
            RESERVATION_UPDATE => self.notify_reservation_update,
            RESERVATION_CANCEL => self.notify_reservation_cancel,
            TABLE_AVAILABLE => self.notify_table_available,
            CONFIRMATION_24H => self.notify_confirmation_24h,
            _ => true,
        }
    }
}
