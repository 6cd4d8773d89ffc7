//! Provider callback handlers.
//!
//! Callbacks carry no tenant headers. The status callback matches logs by
//! provider message id; the inbound callback takes its tenant from the path.

use axum::extract::{Path, State};
use axum::response::Response;
use comanda_core::types::{DbId, Tenant};
use comanda_notify::{InboundMessage, StatusUpdate};

use crate::error::AppResult;
use crate::extract::JsonOrForm;
use crate::response::twiml_ack;
use crate::state::AppState;

/// POST /webhook/twilio/status
pub async fn twilio_status(
    State(state): State<AppState>,
    JsonOrForm(update): JsonOrForm<StatusUpdate>,
) -> AppResult<Response> {
    state.webhooks.apply_status(&update).await?;
    Ok(twiml_ack())
}

/// POST /webhook/twilio/inbound/{org_id}/{project_id}
pub async fn twilio_inbound(
    State(state): State<AppState>,
    Path((org_id, project_id)): Path<(DbId, DbId)>,
    JsonOrForm(message): JsonOrForm<InboundMessage>,
) -> AppResult<Response> {
    state
        .webhooks
        .record_inbound(Tenant::new(org_id, project_id), &message)
        .await?;
    Ok(twiml_ack())
}
