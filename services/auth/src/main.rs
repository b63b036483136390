use sea_orm::Database;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use realworld_auth::config::AuthConfig;
use realworld_auth::state::AppState;
use realworld_auth::worker::cleanup::CleanupWorker;
use realworld_core::config::Config;
use realworld_core::tracing::init_tracing;

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = AuthConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        refresh_token_ttl: config.refresh_token_ttl(),
    };

    let cancel = CancellationToken::new();
    let worker = CleanupWorker::new(
        state.cleanup_tokens(),
        config.cleanup_interval(),
        config.cleanup_grace(),
        cancel.clone(),
    );

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => cancel.cancel(),
            Err(e) => error!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    info!(
        interval_secs = config.cleanup_interval_secs,
        grace_secs = config.cleanup_grace_secs,
        "token janitor started"
    );
    worker.run().await;
}
