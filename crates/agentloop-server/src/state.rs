use agentloop::agent::Agent;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::configuration::AppEnvironment;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub default_model: String,
    pub environment: AppEnvironment,
    /// Cancelled on shutdown; every agent run listens on a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(agent: Agent, default_model: String, environment: AppEnvironment) -> Self {
        Self {
            agent: Arc::new(agent),
            default_model,
            environment,
            shutdown: CancellationToken::new(),
        }
    }
}
