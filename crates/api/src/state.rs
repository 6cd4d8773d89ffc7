use std::sync::Arc;

use comanda_db::DbPool;
use comanda_notify::{
    ChannelRegistry, Dispatcher, EventProcessor, NotificationStore, NotifyConfig, TenantDirectory,
    WebhookIngest,
};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, probed by `/health`. `None` when the
    /// engine runs over non-database stores.
    pub pool: Option<DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Templates, configs and logs.
    pub store: Arc<dyn NotificationStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub processor: Arc<EventProcessor>,
    pub webhooks: Arc<WebhookIngest>,
}

impl AppState {
    /// Wire the engine over the given store, directory and adapters.
    pub fn new(
        config: ServerConfig,
        notify: &NotifyConfig,
        pool: Option<DbPool>,
        store: Arc<dyn NotificationStore>,
        directory: Arc<dyn TenantDirectory>,
        adapters: ChannelRegistry,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            adapters,
            notify.default_timezone,
        ));
        let processor = Arc::new(EventProcessor::new(
            Arc::clone(&store),
            directory,
            Arc::clone(&dispatcher),
        ));
        let webhooks = Arc::new(WebhookIngest::new(Arc::clone(&store)));

        Self {
            pool,
            config: Arc::new(config),
            store,
            dispatcher,
            processor,
            webhooks,
        }
    }
}
