mod configuration;
mod error;
mod logging;
mod routes;
mod state;

use agentloop::agent::Agent;
use agentloop::providers::mistral::MistralProvider;
use agentloop::tools::create_default_registry;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let settings = configuration::Settings::new()?;

    logging::init(
        &settings.logging,
        settings.logging.format_for(settings.environment),
    )?;

    let provider = MistralProvider::new(settings.provider.to_config()?)?;
    let mut registry = create_default_registry()?;
    if let Some(timeout) = settings.provider.tool_timeout() {
        registry = registry.with_timeout(timeout);
    }
    info!(
        tools = registry.len(),
        model = %settings.provider.model,
        environment = settings.environment.as_str(),
        "agent_configured"
    );

    let agent = Agent::new(Arc::new(provider), Arc::new(registry));
    let state = state::AppState::new(
        agent,
        settings.provider.model.clone(),
        settings.environment,
    );
    let shutdown = state.shutdown.clone();

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(settings.server.socket_addr()?).await?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down, cancelling in-flight agent runs");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
