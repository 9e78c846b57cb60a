//! Care Billing reconciliation server.
//!
//! Reads the tariff configuration directory from `CARE_BILLING_CONFIG`
//! (default `./config/berlin_lk`) and listens on `CARE_BILLING_ADDR`
//! (default `127.0.0.1:3000`).

use std::env;

use care_billing::api::{AppState, create_router};
use care_billing::config::ConfigLoader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG_DIR: &str = "./config/berlin_lk";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_dir = env::var("CARE_BILLING_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.into());
    let addr = env::var("CARE_BILLING_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.into());

    let config = ConfigLoader::load(&config_dir)?;
    info!(
        config_dir = %config_dir,
        tariff = %config.metadata().code,
        tariff_version = %config.metadata().version,
        rate_tables = config.config().rates().len(),
        "Loaded tariff configuration"
    );

    let app = create_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
