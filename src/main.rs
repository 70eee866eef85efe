use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hive::config::{AppConfig, StorageBackend};
use hive::store::memory::MemStore;
use hive::store::postgres::PgStore;
use hive::store::Store;
use hive::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::Memory => Arc::new(MemStore::new()),
        StorageBackend::Postgres => Arc::new(PgStore::connect(&config).await?),
    };

    if config.seed_demo_data {
        hive::app::seed::apply(store.as_ref()).await?;
    }

    let state = AppState {
        store,
        token_key: config.token_key,
        token_ttl_hours: config.token_ttl_hours,
        mapbox_token: config.mapbox_access_token.clone(),
        aggregation_timeout: Duration::from_millis(config.aggregation_timeout_ms),
    };

    // The admin and bidder dashboards are served from separate origins.
    let app: Router = hive::http::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    tracing::info!("listening on {}", config.http_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
