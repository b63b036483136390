use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::repository::RefreshTokenRepository;
use crate::error::AuthServiceError;
use crate::usecase::refresh_token::CleanupTokensUseCase;

/// Periodically removes used and expired refresh tokens.
///
/// Running late only lets the table grow; failures are logged and the next
/// tick tries again.
pub struct CleanupWorker<R: RefreshTokenRepository> {
    cleanup: CleanupTokensUseCase<R>,
    interval: Duration,
    grace: chrono::Duration,
    cancellation_token: CancellationToken,
}

impl<R: RefreshTokenRepository> CleanupWorker<R> {
    pub fn new(
        cleanup: CleanupTokensUseCase<R>,
        interval: Duration,
        grace: chrono::Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            cleanup,
            interval,
            grace,
            cancellation_token,
        }
    }

    pub async fn tick_once(&self) -> Result<u64, AuthServiceError> {
        let older_than = Utc::now() - self.grace;
        self.cleanup.execute(older_than).await
    }

    /// Run until the cancellation token fires. The first pass runs immediately.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("cleanup worker shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick_once().await {
                        error!(
                            error = %e.log_detail(),
                            kind = e.kind(),
                            "refresh token cleanup failed"
                        );
                    }
                }
            }
        }
    }
}
