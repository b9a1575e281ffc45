//! Geocoding query server.
//!
//! Serves `/search`, `/reverse`, `/lookup`, `/details` and `/status` over a
//! place store backed by Elasticsearch or an in-memory fixture.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use larch::config::{Config, StoreBackend};
use larch::elasticsearch::{ElasticStore, EsClient};
use larch::http::{create_router, AppState};
use larch::ratelimit::RouteLimiters;
use larch::service::GeocodeService;
use larch::store::{MemoryStore, PlaceStore};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Geocoding query server")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config and LARCH_LISTEN)
    #[arg(short, long)]
    listen: Option<String>,

    /// Serve from a JSON place fixture instead of Elasticsearch
    #[arg(long)]
    fixture: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::default(),
    };
    config.apply_env();

    if let Some(listen) = &args.listen {
        config.server.listen = listen.clone();
    }
    if let Some(fixture) = &args.fixture {
        config.store.backend = StoreBackend::Memory;
        config.store.fixture = Some(fixture.clone());
    }

    config.validate()?;
    Ok(config)
}

async fn connect_store(config: &Config) -> Result<Arc<dyn PlaceStore>> {
    match config.store.backend {
        StoreBackend::Memory => {
            let path = config
                .store
                .fixture
                .as_ref()
                .context("store.fixture is required for the memory backend")?;
            info!("Loading place fixture {}", path.display());
            let store = MemoryStore::from_file(path)?;
            info!("Loaded {} places", store.len());
            Ok(Arc::new(store))
        }
        StoreBackend::Elasticsearch => {
            info!("Connecting to Elasticsearch at {}", config.store.es_url);
            let client = EsClient::new(
                &config.store.es_url,
                &config.store.places_index,
                &config.store.address_index,
            )?;

            if !client.health_check().await? {
                anyhow::bail!("Elasticsearch cluster is not healthy");
            }

            let doc_count = client.doc_count().await?;
            info!(
                "Connected to index '{}' with {} documents",
                client.places_index, doc_count
            );
            Ok(Arc::new(ElasticStore::new(client)))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))
        .context("Invalid log level")?;
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Larch Query Server {}", env!("CARGO_PKG_VERSION"));

    let store = connect_store(&config).await?;
    let service = Arc::new(GeocodeService::new(store, config.service_settings()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(service)
        .with_store_timeout(config.store_timeout())
        .with_shutdown(shutdown_rx);

    let limiters = if config.rate_limit.enabled {
        info!(
            "Rate limiting at {} requests/s per route",
            config.rate_limit.requests_per_second
        );
        Some(RouteLimiters::new(config.rate_limit.requests_per_second))
    } else {
        None
    };

    let app = create_router(state, limiters);

    info!("Starting server on {}", config.server.listen);
    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutting down");
            shutdown_tx.send(true).ok();
        })
        .await?;

    Ok(())
}
