//! Shared response envelope types for API handlers.
//!
//! All API responses use a `{ "data": ... }` envelope. Use [`DataResponse`]
//! instead of ad-hoc `serde_json::json!({ "data": ... })`.

use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: items }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// Empty TwiML document the messaging provider expects from callbacks.
pub const TWIML_ACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

/// `200 OK` with [`TWIML_ACK`] as `text/xml`.
pub fn twiml_ack() -> Response {
    ([(CONTENT_TYPE, "text/xml")], TWIML_ACK).into_response()
}
