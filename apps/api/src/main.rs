mod careers;
mod config;
mod errors;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::careers::catalog::{ResourceCatalog, SubstringMatcher};
use crate::config::Config;
use crate::llm_client::retry::ResilientInvoker;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CareerPath API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize model client behind the retry policy
    let gemini = GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    let policy = config.retry_policy();
    let llm = ResilientInvoker::new(Arc::new(gemini), policy);
    info!(
        "LLM client initialized (model: {}, attempts: {}, base delay: {}ms)",
        llm.model_name(),
        policy.max_attempts,
        policy.base_delay.as_millis()
    );

    // Load the resource catalog once; absence only disables the skill-gap endpoint
    let catalog = ResourceCatalog::load(&config.resource_catalog_path)?.map(Arc::new);
    if catalog.is_none() {
        warn!("Skill-gap requests will fail until the resource catalog is provided");
    }

    let state = AppState {
        llm,
        catalog,
        matcher: Arc::new(SubstringMatcher),
    };

    // Build router
    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
