use chrono::Duration;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use realworld_domain::id::{RefreshTokenId, UserId};

use crate::domain::repository::RefreshTokenRepository;
use crate::domain::types::{MAX_ISSUE_ATTEMPTS, OutboxEvent, REUSE_DETECTED_EVENT, RefreshToken};
use crate::error::AuthServiceError;
use crate::usecase::refresh_token::rotate;

// ── Refresh session ──────────────────────────────────────────────────────────

/// Rotation as the authentication flow sees it: collisions are retried,
/// reuse revokes the whole token family, expired rows are dropped eagerly.
pub struct RefreshSessionUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
    pub ttl: Duration,
}

impl<R: RefreshTokenRepository> RefreshSessionUseCase<R> {
    pub async fn execute(&self, presented: &str) -> Result<RefreshToken, AuthServiceError> {
        let mut attempt = 1;
        loop {
            match rotate(&self.tokens, presented, self.ttl).await {
                Err(AuthServiceError::Conflict) if attempt < MAX_ISSUE_ATTEMPTS => {
                    debug!(attempt, "refresh token collision during rotation, retrying");
                    attempt += 1;
                }
                Err(AuthServiceError::ReuseDetected { user_id, token_id }) => {
                    self.revoke_family(user_id, token_id).await?;
                    return Err(AuthServiceError::ReuseDetected { user_id, token_id });
                }
                Err(AuthServiceError::Expired) => {
                    // Best effort; the caller still sees Expired.
                    if let Err(e) = self.tokens.delete_by_token(presented).await {
                        warn!(error = %e.log_detail(), "failed to drop expired refresh token");
                    }
                    return Err(AuthServiceError::Expired);
                }
                other => return other,
            }
        }
    }

    async fn revoke_family(
        &self,
        user_id: UserId,
        token_id: RefreshTokenId,
    ) -> Result<u64, AuthServiceError> {
        let event = reuse_detected_event(user_id, token_id);
        let revoked = self
            .tokens
            .delete_by_user_with_outbox(user_id, &event)
            .await?;
        warn!(
            %user_id,
            %token_id,
            revoked,
            "refresh token reuse detected, token family revoked"
        );
        Ok(revoked)
    }
}

/// Security event queued when a consumed token is replayed.
/// Keyed by the replayed token so concurrent replays enqueue one alert.
pub fn reuse_detected_event(user_id: UserId, token_id: RefreshTokenId) -> OutboxEvent {
    OutboxEvent {
        id: Uuid::new_v4(),
        kind: REUSE_DETECTED_EVENT.to_owned(),
        payload: json!({ "user_id": user_id, "token_id": token_id }),
        idempotency_key: format!("{REUSE_DETECTED_EVENT}:{token_id}"),
    }
}

// ── Logout ───────────────────────────────────────────────────────────────────

pub struct LogoutUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
}

impl<R: RefreshTokenRepository> LogoutUseCase<R> {
    /// Delete the presented token. Unknown tokens are not an error; returns
    /// whether a row was removed.
    pub async fn execute(&self, presented: &str) -> Result<bool, AuthServiceError> {
        self.tokens.delete_by_token(presented).await
    }
}

// ── Revoke all sessions ──────────────────────────────────────────────────────

pub struct RevokeAllSessionsUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
}

impl<R: RefreshTokenRepository> RevokeAllSessionsUseCase<R> {
    pub async fn execute(&self, user_id: UserId) -> Result<u64, AuthServiceError> {
        let revoked = self.tokens.delete_by_user(user_id).await?;
        debug!(%user_id, revoked, "refresh token family revoked");
        Ok(revoked)
    }
}
