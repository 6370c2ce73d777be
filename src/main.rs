use anyhow::{Context, Result};
use arb_translator::config::Config;
use arb_translator::metrics::ServiceMetrics;
use arb_translator::providers::{build_provider, SharedProvider};
use arb_translator::server::{router, AppState};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when not present)
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("arb_translator={}", config.log_level).parse()?)
                .add_directive(format!("tower_http={}", config.log_level).parse()?),
        )
        .init();

    info!("Starting ARB translation service v{}", env!("CARGO_PKG_VERSION"));

    let providers = config.configured_providers();
    if providers.is_empty() {
        warn!("No translation provider credentials found; /translate will fail until one is set");
    } else {
        info!(
            "Configured providers: {}",
            providers.iter().map(|p| p.name()).collect::<Vec<_>>().join(", ")
        );
    }

    let metrics = Arc::new(ServiceMetrics::new());
    let provider_config = config.clone();
    let provider_metrics = config.enable_analytics.then(|| metrics.clone());
    let provider = SharedProvider::new(move || {
        build_provider(&provider_config, provider_metrics.clone())
    });

    let port = config.port;
    let app = router(AppState::new(config, provider, metrics));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
