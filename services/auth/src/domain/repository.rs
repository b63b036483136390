#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use realworld_domain::id::{RefreshTokenId, UserId};

use crate::domain::types::{OutboxEvent, RefreshToken};
use crate::error::AuthServiceError;

/// Durable bookkeeping of refresh-token rows.
pub trait RefreshTokenRepository: Send + Sync {
    /// Insert a new token. `Conflict` if the token value already exists,
    /// `UserNotFound` if the owning user does not.
    async fn insert(&self, token: &RefreshToken) -> Result<(), AuthServiceError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>, AuthServiceError>;

    /// In one transaction: mark `consumed` used at `now` and insert `replacement`.
    ///
    /// The mark only applies while the row is still unused and unexpired at
    /// `now`; otherwise nothing is written and `false` is returned. A
    /// replacement collision rolls back the mark and yields `Conflict`.
    async fn consume_and_replace(
        &self,
        consumed: RefreshTokenId,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, AuthServiceError>;

    /// Delete rows that are used or expired at `older_than`. Returns rows removed.
    async fn delete_stale(&self, older_than: DateTime<Utc>) -> Result<u64, AuthServiceError>;

    /// Delete a single token. Returns `true` if a row was removed.
    async fn delete_by_token(&self, token: &str) -> Result<bool, AuthServiceError>;

    /// Delete every token of a user. Returns rows removed.
    async fn delete_by_user(&self, user_id: UserId) -> Result<u64, AuthServiceError>;

    /// Delete every token of a user and enqueue `event` atomically (same transaction).
    /// An event whose idempotency key is already queued is not duplicated.
    async fn delete_by_user_with_outbox(
        &self,
        user_id: UserId,
        event: &OutboxEvent,
    ) -> Result<u64, AuthServiceError>;
}
