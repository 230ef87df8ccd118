//! lens-identify - Native Lens tree identification service
//!
//! **Module Identity:**
//! - Name: lens-identify
//! - Default port: 5740
//!
//! Backs the mobile client's capture, history, tree library and tree
//! information views: forwards leaf images to the hosted classifier,
//! resolves the answer against the species catalog, keeps the bounded
//! identification history and proxies botanical details.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lens_common::config::{load_toml_config, prepare_root_folder, resolve_root_folder};
use lens_identify::config::resolve_classifier_api_key;
use lens_identify::services::classifier_client::{RoboflowClient, SharedApiKey};
use lens_identify::services::tree_detail_client::HttpTreeDetailClient;
use lens_identify::services::{CaptureFlow, HistoryLedger};
use lens_identify::{build_router, AppState};

/// Command-line arguments (highest configuration priority)
#[derive(Debug, Parser)]
#[command(name = "lens-identify", version, about = "Native Lens tree identification service")]
struct Args {
    /// HTTP port (overrides TOML `port`)
    #[arg(long, env = "NATIVE_LENS_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Root folder holding native-lens.db
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML file (default: ~/.config/native-lens/config.toml)
    #[arg(long, env = "NATIVE_LENS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Log level comes from the TOML file, so load it before tracing
    let toml_config = load_toml_config(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!(
        "Starting Native Lens identification service (lens-identify) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = prepare_root_folder(&root_folder)?;
    info!("Database: {}", db_path.display());

    let db = lens_identify::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let api_key = match resolve_classifier_api_key(&db, &toml_config).await {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("{}", e);
            warn!("Identification requests will fail until an API key is configured");
            None
        }
    };
    let classifier_key: SharedApiKey = Arc::new(RwLock::new(api_key));

    let classifier = RoboflowClient::new(&toml_config.classifier, classifier_key.clone())?;
    info!("Classifier endpoint: {}", classifier.endpoint());

    let details = HttpTreeDetailClient::new(&toml_config.tree_detail)?;
    info!("Tree-detail backend: {}", toml_config.tree_detail.base_url);

    let ledger = Arc::new(HistoryLedger::new(
        db.clone(),
        toml_config.history.duplicate_policy,
    ));
    info!(policy = ?ledger.policy(), "History ledger ready");

    let capture = Arc::new(CaptureFlow::new(
        Arc::new(classifier),
        ledger.clone(),
        toml_config.max_image_bytes,
    ));

    let state = AppState::new(db, ledger, capture, Arc::new(details), classifier_key);
    let app = build_router(state);

    let port = args.port.unwrap_or(toml_config.port);
    let addr = format!("{}:{}", args.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
