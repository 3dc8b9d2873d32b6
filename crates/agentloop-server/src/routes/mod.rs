// Export route modules
pub mod agent;
pub mod chat;
pub mod health;
pub mod messages;
pub mod tools;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(agent::routes(state.clone()))
        .merge(tools::routes(state.clone()))
        .merge(health::routes(state))
}
