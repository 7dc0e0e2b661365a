use crate::services::Services;
use crate::session::SessionConfig;
use std::sync::Arc;

/// Shared application state for HTTP handlers
///
/// Only immutable configuration and service clients live here; every
/// connection owns its own `Session`.
#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    pub session_config: Arc<SessionConfig>,
}

impl AppState {
    pub fn new(services: Services, session_config: SessionConfig) -> Self {
        Self {
            services,
            session_config: Arc::new(session_config),
        }
    }
}
