//! Well-known notification event type names.
//!
//! These are the keys of `notification_configs.event_type` and the
//! `event_type` column of events and logs.

/// A reservation was created.
pub const RESERVATION_CREATE: &str = "reservation_create";

/// A reservation was changed (time, party size, table...).
pub const RESERVATION_UPDATE: &str = "reservation_update";

/// A reservation was cancelled.
pub const RESERVATION_CANCEL: &str = "reservation_cancel";

/// A table was freed and the waiting customer can be seated.
pub const TABLE_AVAILABLE: &str = "table_available";

/// Reminder sent roughly 24 hours before a confirmed reservation.
pub const CONFIRMATION_24H: &str = "confirmation_24h";

/// Every event type the engine knows how to trigger.
pub const ALL: [&str; 5] = [
    RESERVATION_CREATE,
    RESERVATION_UPDATE,
    RESERVATION_CANCEL,
    TABLE_AVAILABLE,
    CONFIRMATION_24H,
];

/// Entity type recorded on events raised for reservations.
pub const ENTITY_RESERVATION: &str = "reservation";

/// Entity type recorded on events raised for tables.
pub const ENTITY_TABLE: &str = "table";
