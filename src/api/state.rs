use std::sync::Arc;

use crate::config::Config;
use crate::services::{ModelRegistry, DEFAULT_TOP_N};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
    /// Number of events recommended per user
    pub top_n: usize,
}

impl AppState {
    pub fn new(registry: Arc<ModelRegistry>, top_n: usize) -> Self {
        Self { registry, top_n }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(ModelRegistry::from_config(config)), config.top_n)
    }

    /// State with the default number of recommendations per user
    pub fn with_registry(registry: ModelRegistry) -> Self {
        Self::new(Arc::new(registry), DEFAULT_TOP_N)
    }
}
