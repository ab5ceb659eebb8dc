//! RideShare client entry point.
//!
//! Wires the wallet bridge and the fullnode client into a ride controller
//! and serves it over a small Axum REST API.

use std::sync::Arc;

use reqwest::Client;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rideshare::api::{self, AppState};
use rideshare::config::Config;
use rideshare::rpc::NodeClient;
use rideshare::wallet::RemoteWallet;
use rideshare::{RideController, Session, Submitter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Signing waits on the user, so the bridge client only bounds the connect.
    let bridge = RemoteWallet::client_builder(config.http_timeout).build()?;
    let node = Client::builder().timeout(config.http_timeout).build()?;

    let session = Session::new(Arc::new(RemoteWallet::new(bridge, &config.wallet_url)));
    let ledger = Arc::new(NodeClient::new(
        node,
        &config.node_url,
        config.poll_interval,
    ));
    let submitter = Submitter::new(ledger, config.finality_timeout);

    match config.finality_timeout {
        Some(limit) => info!("Finality wait bounded to {}s", limit.as_secs()),
        None => info!("Finality wait unbounded"),
    }
    info!(
        "Contract {}::{} on {}",
        config.contract_address, config.contract_module, config.node_url
    );

    let controller = Arc::new(RideController::new(
        session,
        submitter,
        config.contract_address.clone(),
        &config.contract_module,
    ));
    let state = Arc::new(AppState {
        controller,
        wallet_provider: config.wallet_provider.clone(),
    });

    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.api_port);
    info!("API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
