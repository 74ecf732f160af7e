use crate::{config::Config, services::NotificationStore, websocket::ConnectionRegistry};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub registry: ConnectionRegistry,
    pub store: NotificationStore,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = NotificationStore::new(
            config.cache_urls.clone(),
            config.history_size,
            config.cache_ttl_secs,
        );

        Self {
            registry: ConnectionRegistry::new(),
            store,
            config: Arc::new(config),
        }
    }
}
