use std::path::Path;
use std::sync::Arc;

use insight_hunter::config::AppConfig;
use insight_hunter::server::{AppState, app_router};
use insight_hunter::store::{Database, LibSqlBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    eprintln!("📊 Insight Hunter v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Onboarding: http://0.0.0.0:{}/onboard", config.port);
    eprintln!("   API: http://0.0.0.0:{}/api/health", config.port);
    eprintln!("   Template version: {}", config.template_version);

    // ── Database ─────────────────────────────────────────────────────────
    let db: Arc<dyn Database> = Arc::new(
        LibSqlBackend::new_local(Path::new(&config.db_path))
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open database at {}: {}", config.db_path, e);
                std::process::exit(1);
            }),
    );
    eprintln!("   Database: {}\n", config.db_path);

    let state = AppState::new(config.clone(), db);

    // Refuse to start while the catalog's next_slug chain and the canonical
    // order disagree; neither can be silently preferred.
    state
        .catalog
        .verify_chain(state.sequencer.sequence())
        .await?;

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "HTTP server started");
    axum::serve(listener, app_router(state)).await?;

    Ok(())
}
