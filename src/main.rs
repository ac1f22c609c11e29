use campus_chat::api::{create_router, AppState};
use campus_chat::application::ChatTurnOrchestrator;
use campus_chat::infrastructure::{search, AppConfig, MoonshotLlm};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=debug,campus_chat=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    let config = AppConfig::load()?;
    config.validate()?;

    let llm = Arc::new(MoonshotLlm::new(&config.config.llm)?);
    let search = search::from_config(&config.config.search)?;
    info!(
        model = llm.model(),
        search = search.as_ref().map_or("disabled", |s| s.provider()),
        transport = ?config.config.server.transport,
        canned_rules = config.prompts.canned.len(),
        "Chat service configured"
    );

    let orchestrator = ChatTurnOrchestrator::new(&config, llm, search);

    let addr = SocketAddr::new(config.config.server.host.parse()?, config.config.server.port);
    let app = create_router(AppState::new(orchestrator, config));

    info!("API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
