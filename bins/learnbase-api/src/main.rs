mod generator;
mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use generator::ExerciseGenerator;
use learnbase_common::config::AppConfig;
use learnbase_common::progress::ProgressStore;
use learnbase_judge::{LanguageConfigManager, ProcessEngine, Validator};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub validator: Validator,
    pub progress: ProgressStore,
    pub generator: ExerciseGenerator,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // LOG_FORMAT=json switches to one JSON object per line
    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn connect_progress_store(redis_url: Option<&str>) -> anyhow::Result<ProgressStore> {
    let Some(redis_url) = redis_url else {
        info!("REDIS_URL not set, keeping progress in memory");
        return Ok(ProgressStore::in_memory());
    };

    let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;
    let conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;

    info!("Connected to Redis: {}", redis_url);
    Ok(ProgressStore::redis(conn))
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to install CTRL+C handler");
        std::future::pending::<()>().await;
    }
    warn!("Received shutdown signal, finishing in-flight requests...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("Learnbase API booting...");

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let config_manager = LanguageConfigManager::load_default().map_err(|e| {
        error!("Failed to load language configurations: {:#}", e);
        e
    })?;
    info!("Loaded language configurations for: {:?}", config_manager.list_languages());

    let validator = Validator::new(ProcessEngine::new(config_manager))
        .with_timeout(config.timeout)
        .with_max_parallel_tests(config.max_parallel_tests);

    let progress = connect_progress_store(config.redis_url.as_deref()).await?;

    let generator = ExerciseGenerator::new(config.openai.clone());
    if generator.is_remote() {
        info!("Exercise generation backed by OpenAI-compatible API");
    } else {
        info!("OPENAI_API_KEY not set, serving built-in exercises");
    }

    metrics::register().context("Failed to register metrics")?;

    let state = Arc::new(AppState {
        validator,
        progress,
        generator,
    });

    // Build router
    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(
        timeout_ms = config.timeout.as_millis() as u64,
        max_parallel_tests = config.max_parallel_tests,
        "HTTP server listening on {}",
        config.bind_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Learnbase API stopped");
    Ok(())
}
