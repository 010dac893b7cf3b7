use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use garden_core::GardenId;
use garden_sync::{
    load_seed, GardenSession, InMemoryStore, SimulatedGateway, SyncConfig, DEFAULT_HISTORY_LIMIT,
    DEFAULT_PRICE_PER_SPACE_CENTS,
};
use tracing_subscriber::EnvFilter;

mod routes;
mod state;

use state::AppState;

#[derive(Parser)]
#[command(name = "garden_daemon", about = "Garden grid placement service")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:3001")]
    bind: String,
    /// JSON file with gardens, plants, and spaces for the in-memory store.
    #[arg(long, default_value = "./seed/garden.json")]
    seed: PathBuf,
    #[arg(long, default_value = "garden_0001")]
    garden: String,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    #[arg(long, default_value_t = DEFAULT_PRICE_PER_SPACE_CENTS)]
    price_per_space_cents: u64,
    /// Simulated gateway declines every purchase.
    #[arg(long)]
    decline_payments: bool,
    /// Added to every store call, to watch optimistic updates run ahead.
    #[arg(long, default_value_t = 0)]
    store_latency_ms: u64,
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    let seed = load_seed(&cli.seed)?;
    tracing::info!(
        gardens = seed.gardens.len(),
        plants = seed.plants.len(),
        spaces = seed.spaces.len(),
        "seed loaded"
    );
    let store = Arc::new(InMemoryStore::from_seed(seed));
    store.set_latency(Duration::from_millis(cli.store_latency_ms));

    let config = SyncConfig {
        price_per_space_cents: cli.price_per_space_cents,
        history_limit: cli.history_limit,
        ..SyncConfig::default()
    };
    let session = GardenSession::open(store, GardenId::new(cli.garden.clone()), config)
        .await
        .with_context(|| format!("opening garden {}", cli.garden))?;

    let gateway = if cli.decline_payments {
        SimulatedGateway::declining()
    } else {
        SimulatedGateway::approving()
    };
    let cors_origin: HeaderValue = cli
        .cors_origin
        .parse()
        .with_context(|| format!("invalid --cors-origin {}", cli.cors_origin))?;
    let app = routes::make_router_with_cors(AppState::new(session, gateway), cors_origin);

    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;
    tracing::info!(bind = %cli.bind, garden = %cli.garden, "garden_daemon listening");
    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
