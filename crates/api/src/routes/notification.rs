//! Route definitions for the `/notification` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notification`.
///
/// ```text
/// POST   /send                              -> send
/// POST   /event                             -> ingest_event
/// GET    /logs/{org_id}/{project_id}        -> list_logs
/// GET    /templates/{org_id}/{project_id}   -> list_templates
/// POST   /template                          -> create_template
/// PUT    /template                          -> update_template
/// POST   /config                            -> upsert_config
/// GET    /config/{org_id}/{project_id}      -> list_configs
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(notification::send))
        .route("/event", post(notification::ingest_event))
        .route("/logs/{org_id}/{project_id}", get(notification::list_logs))
        .route(
            "/templates/{org_id}/{project_id}",
            get(notification::list_templates),
        )
        .route(
            "/template",
            post(notification::create_template).put(notification::update_template),
        )
        .route("/config", post(notification::upsert_config))
        .route("/config/{org_id}/{project_id}", get(notification::list_configs))
}
