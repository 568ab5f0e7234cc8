// src/main.rs

//! # DID Ledger - Main Entry Point
//!
//! Loads configuration, initializes logging, builds an in-memory DID system
//! and serves it over HTTP.
//!
//! ## Configuration
//! Read from `.env`, an optional `config/default` file and `DID__*`
//! environment variables:
//! - `DID__SERVER__HOST` / `DID__SERVER__PORT`: listen address (default 127.0.0.1:3000)
//! - `DID__LEDGER__SEAL_PROOF`: proof stamped on sealed blocks (default 12345)
//! - `DID__LEDGER__GENESIS_PROOF`: proof of the genesis block (default 100)
//! - `DID__LOG_LEVEL`: default log filter (default info; `RUST_LOG` wins)

use anyhow::Context;
use did_ledger::services::api_server::ApiServer;
use did_ledger::settings::Settings;
use did_ledger::DidSystem;
use dotenv::dotenv;
use log::info;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment configuration
/// 2. Initialize logging
/// 3. Build the DID system (registry, engine, ledger with genesis block)
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let settings = Settings::load().context("failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.log_level.as_str()),
    )
    .init();

    let system = DidSystem::new(&settings.ledger).context("failed to create genesis block")?;
    let api_server = ApiServer::new(system);

    let addr = settings.socket_addr();
    info!("Available endpoints:");
    info!("- POST /create-issuer-did | /create-holder-did | /create-verifier-did");
    info!("- POST /issue-credential | /present-credential | /verify-credential");
    info!("- POST /revoke-credential | /revoke-access-credential");
    info!("- GET  /show-blockchain | /show-dids | /validate-chain");

    api_server
        .run(addr)
        .await
        .with_context(|| format!("API server on {} stopped", addr))
}
