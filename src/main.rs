mod config;
mod error;
mod routes;
mod services;
mod state;
mod store;

use std::sync::Arc;

use axum::ServiceExt;
use axum::extract::Request;

use crate::config::{AppConfig, StorageBackend};
use crate::store::{FileStore, KvStore, MemoryStore};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = AppConfig::from_env();
    let store: Arc<dyn KvStore> = match config.storage {
        StorageBackend::File => {
            let files = FileStore::open(&config.data_dir)
                .await
                .expect("failed to open data directory");
            tracing::info!(root = %files.root().display(), "file store ready");
            Arc::new(files)
        }
        StorageBackend::Memory => {
            tracing::warn!("memory store selected; records are lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let port = config.port;
    let state = state::AppState::new(store, config);

    let app = routes::service(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "uptime api listening");
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
    tracing::info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
