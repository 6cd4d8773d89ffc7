//! Domain vocabulary shared by every Comanda crate.
//!
//! This crate has zero internal dependencies so the repository layer, the
//! notification engine and the HTTP surface can all agree on ids, tenant
//! scoping, channel names and the template renderer.

pub mod channels;
pub mod error;
pub mod event_types;
pub mod log_status;
pub mod render;
pub mod types;
