use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod catalog;
mod database;
mod dataset_manager;
mod error;
mod models;
mod schema;
mod storage;
mod store;
mod web_server;

use database::DatabaseManager;
use dataset_manager::DatasetManager;
use storage::BlobStorage;
use store::CatalogStore;
use web_server::WebServer;

fn masked_database_url(database_url: &str) -> String {
    match (database_url.find("://"), database_url.rfind('@')) {
        (Some(start), Some(end)) if start + 3 < end => {
            format!("{}***{}", &database_url[..start + 3], &database_url[end..])
        }
        _ => database_url.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dataset_catalog_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dataset Catalog Service v0.1.0");

    let http_port: u16 = std::env::var("HTTP_PORT")
        .unwrap_or_else(|_| "8000".to_string())
        .parse()
        .expect("Invalid HTTP_PORT");

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL environment variable is required");

    let blob_store_dir =
        std::env::var("BLOB_STORE_DIR").unwrap_or_else(|_| "blobs".to_string());

    info!("Configuration loaded:");
    info!("  HTTP Port: {}", http_port);
    info!("  Blob Store: {}", blob_store_dir);
    info!("  Database URL: {}", masked_database_url(&database_url));

    let store: Arc<dyn CatalogStore> = Arc::new(DatabaseManager::new(&database_url).await?);
    let blob_storage = BlobStorage::new(blob_store_dir).await?;
    let manager = Arc::new(DatasetManager::new(store, blob_storage));
    info!("Dataset manager initialized successfully");

    let server = WebServer::new(manager);
    let addr: SocketAddr = ([0, 0, 0, 0], http_port).into();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.start(addr).await {
            error!("HTTP server error: {}", e);
        }
    });

    info!("Dataset Catalog Service started successfully");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    server_handle.abort();

    info!("Dataset Catalog Service shutdown complete");
    Ok(())
}
