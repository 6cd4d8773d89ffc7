//! Status values of `notification_logs.status`.
//!
//! The dispatcher only ever writes [`SENT`] or [`FAILED`]. The provider status
//! webhook may later overwrite the column with [`DELIVERED`] or with the raw
//! provider value (`undelivered`, `failed`, `sending`, ...).

pub const SENT: &str = "sent";
pub const FAILED: &str = "failed";
pub const DELIVERED: &str = "delivered";

/// Provider statuses that mean the message reached the handset.
///
/// WhatsApp reports `read` after `delivered`; both count as delivered.
const DELIVERED_CLASS: [&str; 2] = ["delivered", "read"];

/// Statuses of an attempt that never reached the recipient: the
/// dispatcher's own [`FAILED`] and the provider's `failed`/`undelivered`.
pub const FAILED_CLASS: [&str; 2] = ["failed", "undelivered"];

/// Whether a raw provider status belongs to the delivered class.
pub fn is_delivered_class(provider_status: &str) -> bool {
    DELIVERED_CLASS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(provider_status.trim()))
}
