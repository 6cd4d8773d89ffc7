//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Every notification query is
//! scoped by `(org_id, project_id)`.

pub mod notification_config_repo;
pub mod notification_event_repo;
pub mod notification_inbound_repo;
pub mod notification_log_repo;
pub mod notification_template_repo;
pub mod restaurant_repo;

pub use notification_config_repo::NotificationConfigRepo;
pub use notification_event_repo::NotificationEventRepo;
pub use notification_inbound_repo::NotificationInboundRepo;
pub use notification_log_repo::NotificationLogRepo;
pub use notification_template_repo::NotificationTemplateRepo;
pub use restaurant_repo::{CustomerRepo, ProjectRepo, ReservationRepo, TableRepo};
