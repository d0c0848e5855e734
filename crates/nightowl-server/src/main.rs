//! Runs a Nightowl server.
//!
//! - `NIGHTOWL_ADDR`: listen address (default `0.0.0.0:3000`)
//! - `PORT`: used with `0.0.0.0` when `NIGHTOWL_ADDR` is unset
//! - `RUST_LOG`: log filter (default `info`)

use std::env;

use nightowl::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

fn init_telemetry() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();
}

fn listen_addr() -> String {
    if let Ok(addr) = env::var("NIGHTOWL_ADDR") {
        return addr;
    }
    match env::var("PORT") {
        Ok(port) => format!("0.0.0.0:{port}"),
        Err(_) => DEFAULT_ADDR.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), NightowlError> {
    init_telemetry();

    let server = NightowlServer::builder()
        .bind(&listen_addr())
        .build()
        .await?;
    let core = server.handle();

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            if let Ok(stats) = core.stats().await {
                tracing::info!(?stats, "final stats");
            }
            core.shutdown().await
        }
    }
}
