//! Tenant scoping extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use comanda_core::error::CoreError;
use comanda_core::types::{DbId, Tenant};

use crate::error::AppError;

pub const ORG_ID_HEADER: &str = "x-org-id";
pub const PROJECT_ID_HEADER: &str = "x-project-id";

/// The tenant named by the `X-Org-Id` and `X-Project-Id` headers.
///
/// Handlers compare it with the tenant in the path or body via
/// [`TenantHeaders::authorize`]:
///
/// ```ignore
/// async fn my_handler(headers: TenantHeaders, Json(input): Json<Input>) -> AppResult<Json<()>> {
///     let tenant = headers.authorize(Tenant::new(input.org_id, input.project_id))?;
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantHeaders(pub Tenant);

impl TenantHeaders {
    /// Accept `requested` only when it is the header tenant.
    pub fn authorize(&self, requested: Tenant) -> Result<Tenant, AppError> {
        if requested == self.0 {
            Ok(requested)
        } else {
            Err(AppError::Core(CoreError::Forbidden(format!(
                "tenant {requested} does not match request headers"
            ))))
        }
    }
}

impl<S> FromRequestParts<S> for TenantHeaders
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let org_id = header_id(parts, ORG_ID_HEADER, "X-Org-Id")?;
        let project_id = header_id(parts, PROJECT_ID_HEADER, "X-Project-Id")?;
        Ok(TenantHeaders(Tenant::new(org_id, project_id)))
    }
}

fn header_id(parts: &Parts, name: &str, display: &str) -> Result<DbId, AppError> {
    let raw = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {display} header")))?;

    raw.trim()
        .parse::<DbId>()
        .map_err(|_| AppError::BadRequest(format!("Invalid {display} header: {raw}")))
}
