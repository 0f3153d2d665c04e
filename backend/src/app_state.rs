use crate::config::Config;
use crate::massadmin::dispatcher::TaskQueue;
use crate::massadmin::registry::ModelRegistry;
use std::sync::Arc;

/// Shared, read-only state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<ModelRegistry>,
    pub queue: Arc<dyn TaskQueue>,
}
