use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use toxiclass::api::{self, AppState};
use toxiclass::feedback::{self, FeedbackRepository};
use toxiclass::{Classifier, ModelManager, ServiceConfig};

#[derive(Parser)]
#[command(author, version, about = "Toxic comment classification API", long_about = None)]
struct Args {
    /// Force a fresh download of the model files
    #[arg(short, long)]
    fresh: bool,

    /// Address to bind, overrides TOXICLASS_HOST
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides TOXICLASS_PORT
    #[arg(short, long)]
    port: Option<u16>,

    /// SQLite file for feedback, overrides TOXICLASS_DB
    #[arg(long)]
    db: Option<PathBuf>,
}

async fn load_classifier(config: &ServiceConfig, fresh: bool) -> anyhow::Result<Classifier> {
    let manager = ModelManager::new(&config.model.cache_dir)
        .with_context(|| format!("cannot create model cache at {:?}", config.model.cache_dir))?
        .with_token(config.model.hf_token.clone());
    let info = config.model.model_info();

    if fresh {
        info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(&info.name)?;
    }
    manager
        .ensure_model_downloaded(&info)
        .await
        .with_context(|| format!("cannot fetch model {}", config.model.repo_id))?;

    let started = Instant::now();
    let classifier = Classifier::builder()
        .with_runtime_config(config.runtime.clone())
        .with_model(&manager, &info)?
        .with_max_sequence_length(config.model.max_sequence_length)
        .with_threshold(config.threshold)?
        .build()?;
    info!("Classifier ready in {:.2?}", started.elapsed());

    Ok(classifier)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = ServiceConfig::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(db) = args.db {
        config.db_path = db;
    }
    toxiclass::init_logger(&config.log_level);

    info!("=== Starting Toxic Comment Classifier ===");

    let classifier = load_classifier(&config, args.fresh)
        .await
        .context("model initialization failed")?;

    let pool = feedback::init_pool(&config.db_path)
        .await
        .with_context(|| format!("cannot open feedback database {:?}", config.db_path))?;
    let repository = FeedbackRepository::new(pool);

    let state = AppState::new(Arc::new(classifier), repository.clone());
    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("cannot bind {}:{}", config.host, config.port))?;

    api::serve(listener, api::router(state), api::shutdown_signal()).await?;

    repository.close().await;
    info!("=== Shutdown complete ===");
    Ok(())
}
