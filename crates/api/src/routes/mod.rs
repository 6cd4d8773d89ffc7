pub mod health;
pub mod notification;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the route tree.
///
/// ```text
/// /health                                          service health
///
/// /notification/send                               manual send (POST)
/// /notification/event                              ingest domain event (POST)
/// /notification/logs/{org_id}/{project_id}         recent logs (GET)
/// /notification/templates/{org_id}/{project_id}    list templates (GET)
/// /notification/template                           create (POST), update (PUT)
/// /notification/config                             upsert routing (POST)
/// /notification/config/{org_id}/{project_id}       list routing (GET)
///
/// /webhook/twilio/status                           delivery status callback
/// /webhook/twilio/inbound/{org_id}/{project_id}    inbound message callback
/// ```
pub fn app_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/notification", notification::router())
        .nest("/webhook", webhook::router())
}
