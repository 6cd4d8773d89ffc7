//! Row models and DTOs.
//!
//! Each submodule contains:
//! - `FromRow` entity structs matching the database rows
//! - `Deserialize` DTOs for inserts and updates

pub mod notification;
pub mod restaurant;
