use std::sync::Arc;

use crate::application::ChatTurnOrchestrator;
use crate::infrastructure::{AppConfig, Transport};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: ChatTurnOrchestrator,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(orchestrator: ChatTurnOrchestrator, config: AppConfig) -> Self {
        Self {
            orchestrator,
            config: Arc::new(config),
        }
    }

    pub fn transport(&self) -> Transport {
        self.config.config.server.transport
    }
}
