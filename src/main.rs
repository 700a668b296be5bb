use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use eventdesk::auth::AuthClient;
use eventdesk::cli::Args;
use eventdesk::config::Config;
use eventdesk::core::error::AppResult;
use eventdesk::providers::ModelProvider;
use eventdesk::providers::gemini::GeminiProvider;
use eventdesk::server::{self, AppState};
use eventdesk::store::Store;

#[tokio::main]
async fn main() -> AppResult<()> {
    let args = Args::parse();

    let default_filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(fmt::layer().compact())
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = match args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(addr) = args.addr {
        config.addr = Some(addr);
    }

    let (store_url, service_key) = config.store_settings()?;
    let store = Store::new(store_url.clone(), service_key.clone());
    let auth = AuthClient::new(store_url, service_key);

    let model: Option<Arc<dyn ModelProvider>> = match &config.model.api_key {
        Some(api_key) if !api_key.is_empty() => Some(Arc::new(GeminiProvider::new(
            config.model_base_url(),
            api_key.clone(),
            config.model_name(),
        ))),
        _ => {
            warn!("model api key not configured, the chat assistant is disabled");
            None
        }
    };
    if model.is_some() {
        info!("chat assistant enabled with model {}", config.model_name());
    }

    let state = Arc::new(AppState::new(store, auth, model));
    let app = server::router(state);

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("received terminate signal, shutting down");
        },
    }
}
