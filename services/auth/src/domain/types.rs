use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use realworld_domain::id::{RefreshTokenId, UserId};

/// Opaque single-use credential exchanged for a new access credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

/// Lifecycle state of a refresh token at a given instant.
/// `Used` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Active,
    Used,
    Expired,
}

impl RefreshToken {
    /// Build a fresh, unused token valid for `ttl` from `now`.
    pub fn issue(user_id: UserId, token: String, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: RefreshTokenId::new(),
            user_id,
            token,
            created_at: now,
            last_used_at: now,
            expires_at: now + ttl,
            is_used: false,
            used_at: None,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }

    /// Consumption wins over expiry: a used token stays `Used` after it expires.
    pub fn state_at(&self, now: DateTime<Utc>) -> TokenState {
        if self.is_used {
            TokenState::Used
        } else if self.is_expired_at(now) {
            TokenState::Expired
        } else {
            TokenState::Active
        }
    }

    /// Record consumption. `used_at` and `last_used_at` move together.
    pub fn consume(&mut self, at: DateTime<Utc>) {
        self.is_used = true;
        self.used_at = Some(at);
        self.last_used_at = at;
    }

    /// Whether cleanup with the given cutoff removes this row.
    pub fn is_stale_at(&self, older_than: DateTime<Utc>) -> bool {
        self.is_used || self.expires_at <= older_than
    }
}

/// Outbox event for async delivery (security alert after reuse detection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: Uuid,
    pub kind: String,
    pub payload: serde_json::Value,
    pub idempotency_key: String,
}

/// Outbox kind emitted when a consumed refresh token is presented again.
pub const REUSE_DETECTED_EVENT: &str = "refresh_token_reuse_detected";

/// Refresh token length in characters.
pub const REFRESH_TOKEN_LEN: usize = 64;

/// Default refresh token time-to-live in seconds (7 days).
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Attempts made before a token-value collision is surfaced to the caller.
pub const MAX_ISSUE_ATTEMPTS: usize = 3;
