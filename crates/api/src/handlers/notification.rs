//! Handlers for the `/notification` resource.
//!
//! Every endpoint is tenant scoped: the tenant named in the path or body
//! must match the [`TenantHeaders`].

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use comanda_core::channels::Channel;
use comanda_core::error::CoreError;
use comanda_core::types::{DbId, Tenant};
use comanda_db::models::notification::{CreateTemplate, UpdateTemplate, UpsertConfig};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::TenantHeaders;
use crate::query::{clamp_limit, LimitParams, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /notification/send`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub org_id: DbId,
    pub project_id: DbId,
    /// Informational; manual sends do not consult routing configs.
    pub event_type: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub recipient: String,
    pub channel: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub status: &'static str,
    pub external_id: Option<String>,
}

/// Body of `POST /notification/event`.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub org_id: DbId,
    pub project_id: DbId,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: DbId,
    #[serde(default = "empty_object")]
    pub payload: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Body of `POST /notification/template`.
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub org_id: DbId,
    pub project_id: DbId,
    #[serde(flatten)]
    pub template: CreateTemplate,
}

/// Body of `PUT /notification/template`.
#[derive(Debug, Deserialize)]
pub struct UpdateTemplateRequest {
    pub org_id: DbId,
    pub project_id: DbId,
    pub id: DbId,
    #[serde(flatten)]
    pub changes: UpdateTemplate,
}

/// Body of `POST /notification/config`.
#[derive(Debug, Deserialize)]
pub struct UpsertConfigRequest {
    pub org_id: DbId,
    pub project_id: DbId,
    #[serde(flatten)]
    pub config: UpsertConfig,
}

fn validate_channel(channel: &str) -> AppResult<Channel> {
    channel
        .parse()
        .map_err(|e: comanda_core::channels::UnsupportedChannel| {
            AppError::Core(CoreError::Validation(e.to_string()))
        })
}

fn require_non_empty(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// POST /notification/send
///
/// Send one message through the tenant's active template for `channel`.
/// Provider and configuration failures return 500 with the failure message.
pub async fn send(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Json(input): Json<SendRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(input.org_id, input.project_id))?;
    require_non_empty("recipient", &input.recipient)?;

    let result = state
        .dispatcher
        .send_manual(tenant, &input.channel, input.recipient.trim(), &input.variables)
        .await?;

    tracing::info!(
        %tenant,
        channel = %input.channel,
        event_type = input.event_type.as_deref().unwrap_or_default(),
        entity_type = input.entity_type.as_deref().unwrap_or_default(),
        entity_id = input.entity_id,
        "Manual notification dispatched",
    );

    Ok(Json(DataResponse {
        data: SendResponse {
            status: result.status.as_str(),
            external_id: result.external_id,
        },
    }))
}

/// POST /notification/event
///
/// Record a domain event and dispatch it inline. Per-channel failures are
/// reported in the response, never as an error status.
pub async fn ingest_event(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Json(input): Json<EventRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(input.org_id, input.project_id))?;
    require_non_empty("event_type", &input.event_type)?;
    require_non_empty("entity_type", &input.entity_type)?;

    let processed = state
        .processor
        .create_and_process_event(
            tenant,
            input.event_type.trim(),
            input.entity_type.trim(),
            input.entity_id,
            input.payload,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: processed })))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /notification/logs/{org_id}/{project_id}?limit=N
///
/// Most recent logs first. Defaults to 50 rows, capped at 500.
pub async fn list_logs(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Path((org_id, project_id)): Path<(DbId, DbId)>,
    Query(params): Query<LimitParams>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(org_id, project_id))?;
    let limit = clamp_limit(params.limit, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT);

    let logs = state.store.list_recent_logs(tenant, limit).await?;
    Ok(Json(DataResponse { data: logs }))
}

/// GET /notification/templates/{org_id}/{project_id}
pub async fn list_templates(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Path((org_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(org_id, project_id))?;
    let templates = state.store.list_templates(tenant).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /notification/config/{org_id}/{project_id}
pub async fn list_configs(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Path((org_id, project_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(org_id, project_id))?;
    let configs = state.store.list_configs(tenant).await?;
    Ok(Json(DataResponse { data: configs }))
}

// ---------------------------------------------------------------------------
// Management
// ---------------------------------------------------------------------------

/// POST /notification/template
pub async fn create_template(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Json(input): Json<CreateTemplateRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(input.org_id, input.project_id))?;
    validate_channel(&input.template.channel)?;
    require_non_empty("name", &input.template.name)?;
    require_non_empty("body", &input.template.body)?;

    let template = state.store.create_template(tenant, &input.template).await?;

    tracing::info!(%tenant, template_id = template.id, channel = %template.channel, "Template created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// PUT /notification/template
pub async fn update_template(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Json(input): Json<UpdateTemplateRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(input.org_id, input.project_id))?;
    if let Some(channel) = &input.changes.channel {
        validate_channel(channel)?;
    }
    if let Some(body) = &input.changes.body {
        require_non_empty("body", body)?;
    }

    let template = state
        .store
        .update_template(tenant, input.id, &input.changes)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "NotificationTemplate",
            id: input.id,
        }))?;

    tracing::info!(%tenant, template_id = template.id, "Template updated");
    Ok(Json(DataResponse { data: template }))
}

/// POST /notification/config
///
/// Create or overwrite the routing config of one event type.
pub async fn upsert_config(
    headers: TenantHeaders,
    State(state): State<AppState>,
    Json(input): Json<UpsertConfigRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant = headers.authorize(Tenant::new(input.org_id, input.project_id))?;
    require_non_empty("event_type", &input.config.event_type)?;
    for channel in &input.config.channels {
        validate_channel(channel)?;
    }

    let config = state.store.upsert_config(tenant, &input.config).await?;

    tracing::info!(%tenant, event_type = %config.event_type, enabled = config.enabled, "Notification config saved");
    Ok(Json(DataResponse { data: config }))
}
