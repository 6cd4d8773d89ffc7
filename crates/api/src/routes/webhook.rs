//! Route definitions for provider callbacks, mounted at `/webhook`.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/twilio/status", post(webhook::twilio_status))
        .route(
            "/twilio/inbound/{org_id}/{project_id}",
            post(webhook::twilio_inbound),
        )
}
