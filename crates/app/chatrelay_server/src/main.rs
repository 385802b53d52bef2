//! chatrelay HTTP server binary.
//!
//! Loads configuration from the environment (and `.env`), builds the store
//! and provider clients once, and serves the API until Ctrl-C.

use std::sync::Arc;

use chatrelay_api::config::ApiConfig;
use chatrelay_core::config::{RelayConfig, StoreConfig};
use chatrelay_core::provider::ResponseGenerator;
use chatrelay_core::relay::ChatRelay;
use chatrelay_core::store::MessageStore;
use chatrelay_core::store::memory::MemoryMessageStore;
use chatrelay_core::store::postgres::PgMessageStore;
use chatrelay_core::store::supabase::SupabaseMessageStore;
use clap::Parser;
use tracing::{error, info, warn};

/// CLI arguments for the server.
#[derive(Parser, Debug)]
#[command(name = "chatrelay_server", about = "AI chat relay server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// Keep messages in process memory instead of a database (development only).
    #[arg(long, default_value_t = false)]
    memory_store: bool,

    /// Skip embedded migrations when using `DATABASE_URL`.
    #[arg(long, default_value_t = false)]
    skip_migrations: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,chatrelay_api=debug,chatrelay_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let relay_config = if args.memory_store {
        RelayConfig::from_env_with_store(StoreConfig::Memory)
    } else {
        RelayConfig::from_env()
    };
    let relay_config = relay_config
        .inspect_err(|e| error!(error = %e, "invalid configuration, refusing to start"))?;

    let mut api_config = ApiConfig::from_env();
    if let Some(bind) = args.bind {
        api_config.bind_addr = bind;
    }

    info!(
        store = ?relay_config.store,
        gemini_model = %relay_config.gemini.model,
        mistral_model = %relay_config.mistral.model,
        provider_timeout = ?relay_config.provider_timeout,
        "starting chatrelay_server"
    );

    let store = build_store(&relay_config, args.skip_migrations).await?;
    if store.health_check().await {
        info!(store = store.name(), "message store reachable");
    } else {
        warn!(store = store.name(), "message store not reachable at startup");
    }

    let generator = ResponseGenerator::from_config(&relay_config)?;
    let state = chatrelay_api::AppState {
        relay: ChatRelay::new(store, generator),
        config: api_config.clone(),
    };
    let app = chatrelay_api::router(state);

    let listener = tokio::net::TcpListener::bind(&api_config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, origins = ?api_config.allowed_origins, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn build_store(
    config: &RelayConfig,
    skip_migrations: bool,
) -> Result<Arc<dyn MessageStore>, Box<dyn std::error::Error>> {
    let store: Arc<dyn MessageStore> = match &config.store {
        StoreConfig::Postgres { database_url } => {
            let store = PgMessageStore::connect(database_url, config.store_timeout).await?;
            if !skip_migrations {
                info!("running database migrations");
                chatrelay_core::migrate::migrate(store.pool()).await?;
            }
            Arc::new(store)
        }
        StoreConfig::Supabase { url, key } => Arc::new(SupabaseMessageStore::new(
            url,
            key.clone(),
            config.store_timeout,
        )?),
        StoreConfig::Memory => {
            warn!("using in-memory message store; messages are lost on exit");
            Arc::new(MemoryMessageStore::new())
        }
    };
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
