use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use comanda_core::error::CoreError;
use comanda_notify::NotifyError;
use serde_json::json;

/// Error type for HTTP handlers.
///
/// Renders as `{ "error": message, "code": CODE }` with the matching status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input: missing headers, undecodable bodies, blank fields.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A send or ingestion failure whose message is returned to the caller.
    #[error("{0}")]
    Notification(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<NotifyError> for AppError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Database(e) => AppError::Database(e),
            NotifyError::Payload(msg) => AppError::BadRequest(msg),
            other => AppError::Notification(other.to_string()),
        }
    }
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(CoreError::NotFound { entity, id }) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{entity} with id {id} not found"),
            ),
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Core(CoreError::Conflict(msg)) => {
                (StatusCode::CONFLICT, "CONFLICT", msg.clone())
            }
            AppError::Core(CoreError::Forbidden(msg)) => {
                (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone())
            }
            AppError::Core(CoreError::Internal(msg)) => {
                tracing::error!(error = %msg, "Internal core error");
                internal()
            }
            AppError::Database(err) => database_parts(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Notification(msg) => {
                tracing::warn!(error = %msg, "Notification request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "NOTIFICATION_FAILED",
                    msg.clone(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        (status, axum::Json(json!({ "error": message, "code": code }))).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

/// Map a sqlx error to a response.
///
/// `RowNotFound` is 404 and a violated `uq_*` constraint (Postgres `23505`)
/// is 409. An exhausted or closed pool is 503. Anything else is a 500 whose
/// details stay in the log.
fn database_parts(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err)
            if db_err.code().as_deref() == Some("23505")
                && db_err.constraint().is_some_and(|c| c.starts_with("uq_")) =>
        {
            let constraint = db_err.constraint().unwrap_or_default();
            (
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("Duplicate value violates unique constraint: {constraint}"),
            )
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            tracing::error!(error = %err, "Database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "DATABASE_UNAVAILABLE",
                "Database unavailable".to_string(),
            )
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comanda_core::channels::Channel;

    #[test]
    fn notify_errors_map_by_kind() {
        let err: AppError = NotifyError::Payload("bad".into()).into();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err: AppError = NotifyError::TemplateNotFound {
            channel: Channel::Sms,
        }
        .into();
        assert_eq!(err.to_string(), "no active sms template");

        let err: AppError = NotifyError::Database(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn notification_failure_is_500_with_message() {
        let response = AppError::Notification("sms provider not configured".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn closed_pool_is_503() {
        let (status, code, _) = AppError::Database(sqlx::Error::PoolClosed).parts();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(code, "DATABASE_UNAVAILABLE");
    }

    #[test]
    fn missing_row_is_404() {
        let (status, _, _) = AppError::Database(sqlx::Error::RowNotFound).parts();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
