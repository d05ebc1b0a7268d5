use std::path::PathBuf;

use clap::{Parser, Subcommand};
use festival_recommender::{
    api::{create_router, AppState},
    config::Config,
    db::{CatalogStore, ModelStore},
    services::{maintenance, registry},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "festival-recommender", about = "Content-based festival recommendation service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Fit the recommender on the catalog CSV and write the model snapshot
    Train {
        /// Catalog CSV, overrides CATALOG_PATH
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Snapshot output, overrides MODEL_PATH
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("festival_recommender=debug,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Train { catalog, model } => train(config, catalog, model),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let state = AppState::from_config(&config);
    state.registry.warm_up().await;

    let reset_job = if config.reset_enabled {
        Some(maintenance::spawn_daily_reset(
            state.registry.clone(),
            config.reset_at()?,
        ))
    } else {
        tracing::info!("Daily catalog reset disabled");
        None
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(address = %listener.local_addr()?, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(job) = reset_job {
        job.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

fn train(config: Config, catalog: Option<PathBuf>, model: Option<PathBuf>) -> anyhow::Result<()> {
    let catalog_store = CatalogStore::new(catalog.unwrap_or_else(|| config.catalog_path.into()));
    let model_store = ModelStore::new(model.unwrap_or_else(|| config.model_path.into()));

    tracing::info!(
        catalog = %catalog_store.path().display(),
        model = %model_store.path().display(),
        "Training recommender"
    );

    match registry::train(&catalog_store, &model_store) {
        Ok(recommender) => {
            let events = recommender.model().map_or(0, |m| m.len());
            tracing::info!(events, "Model snapshot written");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Training failed");
            Err(e.into())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
