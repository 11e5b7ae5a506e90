use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use service_orders::app_state::AppState;
use service_orders::build_router;
use service_orders::config::{Config, StoreBackend};
use service_orders::db::store::{DocumentStore, FileStore, MemoryStore, PgDocumentStore};
use service_orders::utils::geocode::NominatimGeocoder;

fn init_tracing(config: &Config) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(&config.log_dir).context("Failed to create logs directory")?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "service-orders.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(true))
        .with(fmt::layer().with_target(true).with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}

async fn open_store(config: &Config) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match config.store_backend {
        StoreBackend::File => {
            let store = FileStore::new(&config.store_path);
            info!(path = %store.path().display(), "📁 using file store");
            Arc::new(store)
        }
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            Arc::new(
                PgDocumentStore::connect(url)
                    .await
                    .context("Failed to connect to the database")?,
            )
        }
    };
    info!(backend = store.backend(), "📦 store opened");
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;
    let _guard = init_tracing(&config)?;

    let store = open_store(&config).await?;
    let geocoder = Arc::new(NominatimGeocoder::new(&config.geocoder_url, config.geocoder_timeout)?);

    let addr = config.bind_addr;
    let state = AppState::new(config, store, geocoder);
    state.seed_fixed_accounts().await?;

    let app = build_router(state.clone());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind listener on {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server encountered an error")?;

    info!("🛠️ Closing store...");
    state.store.close().await;
    info!("✅ Store closed. Server shut down.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
        _ = terminate => info!("Received SIGTERM, shutting down..."),
    }
}
