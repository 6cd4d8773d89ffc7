use comanda_core::channels::{Channel, UnsupportedChannel};
use comanda_core::types::Tenant;

/// Errors surfaced by the engine's explicit operations (manual send,
/// event ingestion, webhook ingest, management calls).
///
/// Domain triggers never return this type; they fold failures into a
/// [`TriggerOutcome`](crate::processor::TriggerOutcome).
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    UnsupportedChannel(#[from] UnsupportedChannel),

    #[error("no active {channel} template")]
    TemplateNotFound { channel: Channel },

    #[error("project {0} not found")]
    ProjectNotFound(Tenant),

    #[error("no adapter registered for channel {0}")]
    AdapterMissing(Channel),

    /// The provider rejected the message or could not be reached.
    #[error("{0}")]
    Provider(String),

    #[error("invalid event payload: {0}")]
    Payload(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;
