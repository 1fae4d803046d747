//! Fitroom billing service entry point.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fitroom_core::PaymentPackage;
use fitroom_service::{create_router, AppState, ServiceConfig};
use fitroom_store::{RocksStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fitroom_service=debug,fitroom_store=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting fitroom billing service");

    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        stripe_configured = %config.stripe_secret_key.is_some(),
        webhook_secret_configured = %config.stripe_webhook_secret.is_some(),
        "Service configuration loaded"
    );

    tracing::info!(path = %config.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&config.data_dir)?);

    seed_default_packages(store.as_ref())?;

    let state = AppState::new(store, config.clone());
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed the built-in package catalog on first boot.
fn seed_default_packages(store: &dyn Store) -> Result<(), fitroom_store::StoreError> {
    if !store.list_active_packages()?.is_empty() {
        return Ok(());
    }

    for package in PaymentPackage::default_catalog() {
        tracing::info!(code = %package.code, credits = %package.credits, "Seeding package");
        store.put_package(&package)?;
    }
    Ok(())
}
