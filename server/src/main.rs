use actix_web::{middleware as actix_middleware, App, HttpServer};
use anyhow::Context;
use mongodb::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use lessonlog::config::{AppConfig, StoreBackend};
use lessonlog::db::{MemoryStore, MongoDbContext, Store};
use lessonlog::middleware::session_middleware;
use lessonlog::state::AppState;

async fn connect_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
    match config.store_backend {
        StoreBackend::Memory => {
            log::warn!("Using in-memory store; records are lost on shutdown");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Mongo => {
            log::info!("Connecting to MongoDB at {}...", config.mongo_uri);
            let client = Client::with_uri_str(&config.mongo_uri)
                .await
                .context("Failed to connect to MongoDB")?;

            let db_context = MongoDbContext::new(client, &config.mongo_dbname);

            log::info!("Initializing database indexes...");
            db_context
                .init_indexes()
                .await
                .context("Failed to initialize database indexes")?;

            Ok(Arc::new(db_context))
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (for development)
    if dotenvy::dotenv().is_err() {
        dotenvy::from_filename("server/.env").ok();
    }

    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting lesson log...");

    let config_path = PathBuf::from(
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "server/config/lessonlog.toml".to_string()),
    );
    let config = AppConfig::load(Some(&config_path))
        .with_context(|| format!("Failed to load configuration from '{}'", config_path.display()))?;

    let secret = config
        .secret_key
        .clone()
        .context("SECRET_KEY must be set (at least 32 bytes)")?;

    let store = connect_store(&config).await?;
    let state = AppState::from_config(store, &config, &secret)?;

    log::info!(
        "Session expiry set to {} hours",
        config.session_expiry_hours
    );

    // Spawn background cleanup tasks
    let session_manager = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = session_manager.cleanup_expired();
            if removed > 0 {
                log::info!("Background cleanup: removed {} expired sessions", removed);
            }
        }
    });

    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(300)); // Every 5 minutes
        loop {
            interval.tick().await;
            rate_limiter.cleanup_old_entries();
            log::debug!("Background cleanup: cleaned rate limiter entries");
        }
    });

    let (host, port) = config.bind_address();
    log::info!("Starting HTTP server at {}:{}...", host, port);

    HttpServer::new(move || {
        App::new()
            .configure(|cfg| state.configure(cfg))
            .wrap(actix_middleware::from_fn(session_middleware))
            .wrap(actix_middleware::Logger::default())
            .wrap(actix_middleware::Compress::default())
    })
    .bind((host, port))?
    .run()
    .await?;

    Ok(())
}
