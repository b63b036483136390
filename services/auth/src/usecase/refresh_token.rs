use chrono::{DateTime, Duration, Utc};
use rand::RngExt;
use tracing::{debug, info};

use realworld_domain::id::UserId;

use crate::domain::repository::RefreshTokenRepository;
use crate::domain::types::{MAX_ISSUE_ATTEMPTS, REFRESH_TOKEN_LEN, RefreshToken, TokenState};
use crate::error::AuthServiceError;

/// Charset for generating opaque refresh tokens (alphanumeric, both cases).
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Draw a new token value from the thread-local CSPRNG.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..REFRESH_TOKEN_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

// ── Issue ─────────────────────────────────────────────────────────────────────

pub struct IssueTokenUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
    pub ttl: Duration,
}

impl<R: RefreshTokenRepository> IssueTokenUseCase<R> {
    /// Persist a new token for `user_id`. A value collision is retried with a
    /// fresh value; `Conflict` surfaces only after `MAX_ISSUE_ATTEMPTS`.
    pub async fn execute(&self, user_id: UserId) -> Result<RefreshToken, AuthServiceError> {
        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = RefreshToken::issue(user_id, generate_token(), Utc::now(), self.ttl);
            match self.tokens.insert(&token).await {
                Ok(()) => {
                    debug!(%user_id, token_id = %token.id, "refresh token issued");
                    return Ok(token);
                }
                Err(AuthServiceError::Conflict) => {
                    debug!(%user_id, attempt, "refresh token collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AuthServiceError::Conflict)
    }
}

// ── Lookup ────────────────────────────────────────────────────────────────────

pub struct LookupTokenUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
}

impl<R: RefreshTokenRepository> LookupTokenUseCase<R> {
    pub async fn execute(&self, token: &str) -> Result<RefreshToken, AuthServiceError> {
        self.tokens
            .find_by_token(token)
            .await?
            .ok_or(AuthServiceError::NotFound)
    }
}

// ── Rotate ────────────────────────────────────────────────────────────────────

pub struct RotateTokenUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
    pub ttl: Duration,
}

impl<R: RefreshTokenRepository> RotateTokenUseCase<R> {
    /// Consume `presented` and return its replacement.
    pub async fn execute(&self, presented: &str) -> Result<RefreshToken, AuthServiceError> {
        rotate(&self.tokens, presented, self.ttl).await
    }
}

/// Shared by `RotateTokenUseCase` and the session policy.
pub(crate) async fn rotate<R: RefreshTokenRepository>(
    tokens: &R,
    presented: &str,
    ttl: Duration,
) -> Result<RefreshToken, AuthServiceError> {
    let current = tokens
        .find_by_token(presented)
        .await?
        .ok_or(AuthServiceError::NotFound)?;

    let now = Utc::now();
    ensure_rotatable(&current, now)?;

    let replacement = RefreshToken::issue(current.user_id, generate_token(), now, ttl);
    if tokens
        .consume_and_replace(current.id, &replacement, now)
        .await?
    {
        debug!(
            user_id = %current.user_id,
            consumed = %current.id,
            issued = %replacement.id,
            "refresh token rotated"
        );
        return Ok(replacement);
    }

    // Lost a race against another rotation or cleanup; report what the row is now.
    let current = tokens
        .find_by_token(presented)
        .await?
        .ok_or(AuthServiceError::NotFound)?;
    ensure_rotatable(&current, Utc::now())?;
    Err(AuthServiceError::Internal(anyhow::anyhow!(
        "refresh token {} still active after a missed consume",
        current.id
    )))
}

fn ensure_rotatable(token: &RefreshToken, now: DateTime<Utc>) -> Result<(), AuthServiceError> {
    match token.state_at(now) {
        TokenState::Active => Ok(()),
        TokenState::Used => Err(AuthServiceError::ReuseDetected {
            user_id: token.user_id,
            token_id: token.id,
        }),
        TokenState::Expired => Err(AuthServiceError::Expired),
    }
}

// ── Cleanup ───────────────────────────────────────────────────────────────────

pub struct CleanupTokensUseCase<R: RefreshTokenRepository> {
    pub tokens: R,
}

impl<R: RefreshTokenRepository> CleanupTokensUseCase<R> {
    /// Remove used rows and rows expired at `older_than`. Active rows are kept.
    pub async fn execute(&self, older_than: DateTime<Utc>) -> Result<u64, AuthServiceError> {
        let removed = self.tokens.delete_stale(older_than).await?;
        info!(removed, %older_than, "stale refresh tokens removed");
        Ok(removed)
    }
}
